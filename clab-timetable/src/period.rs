use serde::Serialize;
use time::macros::time;
use time::{PrimitiveDateTime, Time, Weekday};

/// Indicators stay off before this time of day.
pub const ACTIVATION: Time = time!(07:00);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Period {
  pub start: Time,
  pub end: Time,
}

impl Period {
  pub const fn new(start: Time, end: Time) -> Self {
    Self { start, end }
  }

  pub fn contains(&self, time: Time) -> bool {
    self.start <= time && time < self.end
  }
}

/// Fixed daily periods, identical for every school day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeriodSchedule {
  periods: Vec<Period>,
}

impl Default for PeriodSchedule {
  fn default() -> Self {
    Self::new(vec![
      Period::new(time!(08:34), time!(09:30)),
      Period::new(time!(09:40), time!(10:25)),
      Period::new(time!(10:35), time!(11:20)),
      Period::new(time!(11:30), time!(12:15)),
      Period::new(time!(13:00), time!(13:45)),
      Period::new(time!(13:55), time!(14:40)),
      Period::new(time!(14:50), time!(15:35)),
    ])
  }
}

/// Where today's timetable stands relative to the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "period", rename_all = "snake_case")]
pub enum Indicator {
  /// Too early, or the selected day is not today.
  Inactive,
  InPeriod(usize),
  Upcoming(usize),
  /// Every period of the day is over.
  None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel {
  Hidden,
  Shown(Indicator),
}

/// Visual state of one rendered timetable row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowMark {
  #[default]
  Plain,
  Highlight,
  Next,
}

impl PeriodSchedule {
  pub fn new(periods: Vec<Period>) -> Self {
    Self { periods }
  }

  pub fn periods(&self) -> &[Period] {
    &self.periods
  }

  pub fn get(&self, index: usize) -> Option<&Period> {
    self.periods.get(index)
  }

  pub fn indicator(&self, now: PrimitiveDateTime, selected: Weekday) -> Indicator {
    let time = now.time();

    if time < ACTIVATION || selected != now.weekday() {
      return Indicator::Inactive;
    }

    if let Some(index) = self.periods.iter().position(|period| period.contains(time)) {
      return Indicator::InPeriod(index);
    }

    match self.periods.iter().position(|period| time < period.start) {
      Some(index) => Indicator::Upcoming(index),
      None => Indicator::None,
    }
  }

  /// Like [`PeriodSchedule::indicator`], but hides the whole panel when both
  /// today and the selected day fall on a weekend.
  pub fn panel(&self, now: PrimitiveDateTime, selected: Weekday) -> Panel {
    if is_weekend(now.weekday()) && is_weekend(selected) {
      return Panel::Hidden;
    }

    Panel::Shown(self.indicator(now, selected))
  }
}

impl Indicator {
  /// Marks for `rows` rendered rows, starting from a clean slate.
  pub fn marks(&self, rows: usize) -> Vec<RowMark> {
    let mut marks = vec![RowMark::Plain; rows];

    match *self {
      Indicator::InPeriod(index) if index < rows => marks[index] = RowMark::Highlight,
      Indicator::Upcoming(index) if index < rows => marks[index] = RowMark::Next,
      _ => {}
    }

    marks
  }
}

pub fn is_weekend(weekday: Weekday) -> bool {
  matches!(weekday, Weekday::Saturday | Weekday::Sunday)
}

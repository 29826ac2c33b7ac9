use sailfish::TemplateOnce;
use time::{Date, PrimitiveDateTime, Time, Weekday};

use clab_timetable::calendar::{
  events_on, shift_month, upcoming, CalendarEvent, MonthGrid, UPCOMING_LIMIT,
};
use clab_timetable::grid::{SchoolDay, TimetableGrid};
use clab_timetable::period::{Panel, PeriodSchedule, RowMark};
use clab_timetable::selection::{
  default_day, parse_weekday, restore_class, weekday_slug, Selection,
};
use clab_timetable::Error;

pub const TIMETABLE_UNAVAILABLE: &str =
  "Timetable data could not be loaded. Please check your network connection.";
pub const TIMETABLE_NOT_FOUND: &str = "No timetable found.";
pub const INVALID_DAY: &str = "Invalid day selected.";
pub const EVENTS_UNAVAILABLE: &str = "Events could not be loaded.";
pub const NO_EVENTS: &str = "No upcoming events.";

/// Seconds between automatic reloads of the home page.
pub const REFRESH_SECONDS: u32 = 60;

/// Class and day requested explicitly, before falling back to cookies.
#[derive(Debug, Default)]
pub struct Requested<'a> {
  pub class: Option<&'a str>,
  pub day: Option<&'a str>,
  pub cookie: Option<&'a str>,
  pub stored: Option<&'a str>,
}

pub fn resolve_selection(
  grid: &TimetableGrid,
  requested: &Requested,
  today: Weekday,
) -> Option<Selection> {
  let class = match requested.class.filter(|class| grid.contains(class)) {
    Some(class) => class,
    None => restore_class(grid, requested.cookie, requested.stored)?,
  };

  let day = requested
    .day
    .and_then(parse_weekday)
    .unwrap_or_else(|| default_day(today));

  Some(Selection {
    class: class.to_string(),
    day,
  })
}

pub struct DayOption {
  pub slug: &'static str,
  pub label: String,
  pub selected: bool,
}

pub struct PeriodRow {
  pub number: usize,
  pub time: String,
  pub subject: String,
  pub mark: RowMark,
}

impl PeriodRow {
  pub fn highlighted(&self) -> bool {
    self.mark == RowMark::Highlight
  }

  pub fn next(&self) -> bool {
    self.mark == RowMark::Next
  }
}

pub enum TimetablePanel {
  Hidden,
  Message(&'static str),
  Rows(Vec<PeriodRow>),
}

impl TimetablePanel {
  pub fn hidden(&self) -> bool {
    matches!(self, TimetablePanel::Hidden)
  }

  pub fn message(&self) -> Option<&'static str> {
    match self {
      TimetablePanel::Message(message) => Some(*message),
      _ => None,
    }
  }

  pub fn rows(&self) -> &[PeriodRow] {
    match self {
      TimetablePanel::Rows(rows) => rows,
      _ => &[],
    }
  }
}

pub struct EventLine {
  pub date: String,
  pub name: String,
}

pub enum EventsPanel {
  Message(&'static str),
  Events(Vec<EventLine>),
}

impl EventsPanel {
  pub fn message(&self) -> Option<&'static str> {
    match self {
      EventsPanel::Message(message) => Some(*message),
      EventsPanel::Events(_) => None,
    }
  }

  pub fn events(&self) -> &[EventLine] {
    match self {
      EventsPanel::Events(events) => events,
      EventsPanel::Message(_) => &[],
    }
  }
}

pub struct HomePage {
  pub classes: Vec<String>,
  pub selected_class: Option<String>,
  pub days: Vec<DayOption>,
  pub timetable: TimetablePanel,
  pub events: EventsPanel,
}

#[derive(TemplateOnce)]
#[template(path = "home.stpl")]
pub struct HomeTemplate<'a> {
  pub page: &'a HomePage,
}

pub fn home(
  now: PrimitiveDateTime,
  schedule: &PeriodSchedule,
  grid: Option<&TimetableGrid>,
  selection: Option<&Selection>,
  events: Option<&[CalendarEvent]>,
) -> HomePage {
  let selected_day = selection
    .map(|selection| selection.day)
    .unwrap_or_else(|| default_day(now.weekday()));

  let days = SchoolDay::ALL
    .iter()
    .map(|day| DayOption {
      slug: weekday_slug(day.weekday()),
      label: day.to_string(),
      selected: day.weekday() == selected_day,
    })
    .collect();

  HomePage {
    classes: grid
      .map(|grid| grid.classes().map(str::to_string).collect())
      .unwrap_or_default(),
    selected_class: selection.map(|selection| selection.class.clone()),
    days,
    timetable: timetable_panel(now, schedule, grid, selection),
    events: events_panel(now.date(), events),
  }
}

fn timetable_panel(
  now: PrimitiveDateTime,
  schedule: &PeriodSchedule,
  grid: Option<&TimetableGrid>,
  selection: Option<&Selection>,
) -> TimetablePanel {
  let Some(grid) = grid else {
    return TimetablePanel::Message(TIMETABLE_UNAVAILABLE);
  };
  let Some(selection) = selection else {
    return TimetablePanel::Message(TIMETABLE_NOT_FOUND);
  };

  let indicator = match schedule.panel(now, selection.day) {
    Panel::Hidden => return TimetablePanel::Hidden,
    Panel::Shown(indicator) => indicator,
  };

  let lessons = match grid.lessons(&selection.class, selection.day) {
    Ok(lessons) => lessons,
    Err(Error::InvalidDay(_)) => return TimetablePanel::Message(INVALID_DAY),
    Err(_) => return TimetablePanel::Message(TIMETABLE_NOT_FOUND),
  };

  let rows = lessons
    .iter()
    .zip(indicator.marks(lessons.len()))
    .enumerate()
    .map(|(index, (subject, mark))| PeriodRow {
      number: index + 1,
      time: period_time(schedule, index),
      subject: subject.clone(),
      mark,
    })
    .collect();

  TimetablePanel::Rows(rows)
}

fn events_panel(today: Date, events: Option<&[CalendarEvent]>) -> EventsPanel {
  let Some(events) = events else {
    return EventsPanel::Message(EVENTS_UNAVAILABLE);
  };

  let next = upcoming(events, today, UPCOMING_LIMIT);
  if next.is_empty() {
    return EventsPanel::Message(NO_EVENTS);
  }

  EventsPanel::Events(
    next
      .into_iter()
      .map(|event| EventLine {
        date: format_date(event.date),
        name: event.name.clone(),
      })
      .collect(),
  )
}

pub struct ScheduleRow {
  pub number: usize,
  pub time: String,
  pub cells: Vec<String>,
}

pub struct SchedulePage {
  pub classes: Vec<String>,
  pub selected_class: Option<String>,
  pub days: Vec<String>,
  pub rows: Vec<ScheduleRow>,
  pub message: Option<&'static str>,
}

#[derive(TemplateOnce)]
#[template(path = "schedule.stpl")]
pub struct ScheduleTemplate<'a> {
  pub page: &'a SchedulePage,
}

/// Whole week of one class, one row per period of the day.
pub fn schedule(
  schedule: &PeriodSchedule,
  grid: Option<&TimetableGrid>,
  class: Option<&str>,
) -> SchedulePage {
  let periods = schedule.periods().len();
  let record = grid.zip(class).and_then(|(grid, class)| grid.get(class));
  let filled = record.map_or(0, |record| record.max_periods().min(periods));

  let rows = (0..periods)
    .map(|index| ScheduleRow {
      number: index + 1,
      time: period_time(schedule, index),
      cells: SchoolDay::ALL
        .iter()
        .map(|day| match record {
          Some(record) if index < filled => {
            record.day(*day).get(index).cloned().unwrap_or_default()
          }
          _ => String::new(),
        })
        .collect(),
    })
    .collect();

  let message = match (grid, class, record) {
    (None, ..) => Some(TIMETABLE_UNAVAILABLE),
    (Some(grid), None, _) if !grid.is_empty() => None,
    (Some(_), _, None) => Some(TIMETABLE_NOT_FOUND),
    (Some(_), _, Some(_)) => None,
  };

  SchedulePage {
    classes: grid
      .map(|grid| grid.classes().map(str::to_string).collect())
      .unwrap_or_default(),
    selected_class: record.and(class).map(str::to_string),
    days: SchoolDay::ALL.iter().map(SchoolDay::to_string).collect(),
    rows,
    message,
  }
}

pub struct DayCell {
  pub day: u8,
  pub today: bool,
  pub events: Vec<String>,
}

pub struct CalendarPage {
  pub title: String,
  pub previous: (i32, u8),
  pub next: (i32, u8),
  pub weeks: Vec<Vec<Option<DayCell>>>,
  pub message: Option<&'static str>,
}

#[derive(TemplateOnce)]
#[template(path = "calendar.stpl")]
pub struct CalendarTemplate<'a> {
  pub page: &'a CalendarPage,
}

pub fn calendar(grid: &MonthGrid, today: Date, events: Option<&[CalendarEvent]>) -> CalendarPage {
  let weeks = grid
    .weeks
    .iter()
    .map(|week| {
      week
        .iter()
        .map(|cell| {
          let day = (*cell)?;
          let date = grid.date(day)?;
          Some(DayCell {
            day,
            today: date == today,
            events: events
              .map(|events| events_on(events, date).map(|event| event.name.clone()).collect())
              .unwrap_or_default(),
          })
        })
        .collect()
    })
    .collect();

  let (previous_year, previous_month) = shift_month(grid.year, grid.month, -1);
  let (next_year, next_month) = shift_month(grid.year, grid.month, 1);

  CalendarPage {
    title: format!("{} {}", grid.month, grid.year),
    previous: (previous_year, previous_month as u8),
    next: (next_year, next_month as u8),
    weeks,
    message: events.is_none().then_some(EVENTS_UNAVAILABLE),
  }
}

fn period_time(schedule: &PeriodSchedule, index: usize) -> String {
  schedule
    .get(index)
    .map(|period| format!("{}–{}", format_time(period.start), format_time(period.end)))
    .unwrap_or_default()
}

fn format_time(time: Time) -> String {
  format!("{:02}:{:02}", time.hour(), time.minute())
}

fn format_date(date: Date) -> String {
  format!("{}/{}/{}", date.year(), date.month() as u8, date.day())
}

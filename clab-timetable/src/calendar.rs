use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use time::error::ComponentRange;
use time::util::days_in_year_month;
use time::{Date, Month};

use crate::rows::parse_rows;

static DATE_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(\d{1,4})/(\d{1,2})/(\d{1,2})$").unwrap());

/// Entries shown in the "next events" summary.
pub const UPCOMING_LIMIT: usize = 3;

/// Weeks a month grid may span.
pub const MAX_WEEKS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
  pub date: Date,
  pub name: String,
}

/// Reads `YYYY/MM/DD,Name` lines. Lines with a bad date or no name are dropped.
pub fn parse_events(text: &str) -> Vec<CalendarEvent> {
  parse_rows(text)
    .into_iter()
    .filter_map(|row| {
      let mut cells = row.into_iter();
      let date = parse_date(cells.next()??.as_str())?;
      let name = cells.next()??;
      Some(CalendarEvent { date, name })
    })
    .collect()
}

/// Parses `YYYY/M/D`, with or without zero padding.
pub fn parse_date(value: &str) -> Option<Date> {
  let captures = DATE_REGEX.captures(value)?;

  let year = i32::from_str(&captures[1]).ok()?;
  let month = u8::from_str(&captures[2]).ok()?;
  let day = u8::from_str(&captures[3]).ok()?;

  if year == 0 {
    return None;
  }

  Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// The `limit` soonest events on or after `today`, same-day events in input order.
pub fn upcoming(events: &[CalendarEvent], today: Date, limit: usize) -> Vec<&CalendarEvent> {
  let mut future = events
    .iter()
    .filter(|event| event.date >= today)
    .collect::<Vec<&CalendarEvent>>();

  future.sort_by_key(|event| event.date);
  future.truncate(limit);
  future
}

/// Events on exactly `date`, in input order.
pub fn events_on(events: &[CalendarEvent], date: Date) -> impl Iterator<Item = &CalendarEvent> {
  events.iter().filter(move |event| event.date == date)
}

/// Moves `delta` months away from `year`/`month`.
pub fn shift_month(year: i32, month: Month, delta: i32) -> (i32, Month) {
  let index = year * 12 + (month as i32 - 1) + delta;
  (
    index.div_euclid(12),
    Month::January.nth_next(index.rem_euclid(12) as u8),
  )
}

/// Day numbers of one month laid out in Sunday-first weeks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthGrid {
  pub year: i32,
  pub month: Month,
  pub weeks: Vec<[Option<u8>; 7]>,
}

impl MonthGrid {
  pub fn new(year: i32, month: Month) -> Result<Self, ComponentRange> {
    let first = Date::from_calendar_date(year, month, 1)?;
    let last = days_in_year_month(year, month);
    let offset = first.weekday().number_days_from_sunday() as usize;

    let mut weeks = Vec::with_capacity(MAX_WEEKS);
    let mut day = 1;

    for week in 0..MAX_WEEKS {
      let mut cells = [None; 7];

      for (column, cell) in cells.iter_mut().enumerate() {
        if (week == 0 && column < offset) || day > last {
          continue;
        }
        *cell = Some(day);
        day += 1;
      }

      weeks.push(cells);

      if day > last {
        break;
      }
    }

    Ok(Self { year, month, weeks })
  }

  pub fn date(&self, day: u8) -> Option<Date> {
    Date::from_calendar_date(self.year, self.month, day).ok()
  }
}

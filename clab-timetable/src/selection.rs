use time::Weekday;

use crate::grid::TimetableGrid;
use crate::period::is_weekend;

/// Cookie holding the last selected class.
pub const CLASS_COOKIE: &str = "selectedHR";
/// Secondary copy of the last selected class, consulted after [`CLASS_COOKIE`].
pub const STORED_CLASS_COOKIE: &str = "selectedClass";
pub const COOKIE_MAX_AGE_DAYS: i64 = 180;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
  pub class: String,
  pub day: Weekday,
}

/// Picks the class to show.
///
/// The first non-empty value of `cookie` and `stored` wins if the grid knows
/// it; otherwise the first class in sorted order is used.
pub fn restore_class<'a>(
  grid: &'a TimetableGrid,
  cookie: Option<&str>,
  stored: Option<&str>,
) -> Option<&'a str> {
  let saved = cookie
    .filter(|value| !value.is_empty())
    .or(stored.filter(|value| !value.is_empty()));

  if let Some(saved) = saved {
    if let Some(class) = grid.classes().find(|class| *class == saved) {
      return Some(class);
    }
  }

  grid.classes().next()
}

/// Day preselected on page load; weekends show Monday.
pub fn default_day(today: Weekday) -> Weekday {
  if is_weekend(today) {
    Weekday::Monday
  } else {
    today
  }
}

pub fn parse_weekday(value: &str) -> Option<Weekday> {
  let weekday = match value.to_ascii_lowercase().as_str() {
    "mon" | "monday" => Weekday::Monday,
    "tue" | "tuesday" => Weekday::Tuesday,
    "wed" | "wednesday" => Weekday::Wednesday,
    "thu" | "thursday" => Weekday::Thursday,
    "fri" | "friday" => Weekday::Friday,
    "sat" | "saturday" => Weekday::Saturday,
    "sun" | "sunday" => Weekday::Sunday,
    _ => return None,
  };

  Some(weekday)
}

pub fn weekday_slug(weekday: Weekday) -> &'static str {
  match weekday {
    Weekday::Monday => "mon",
    Weekday::Tuesday => "tue",
    Weekday::Wednesday => "wed",
    Weekday::Thursday => "thu",
    Weekday::Friday => "fri",
    Weekday::Saturday => "sat",
    Weekday::Sunday => "sun",
  }
}

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use csv::{QuoteStyle, WriterBuilder};
use serde::{Deserialize, Serialize};
use time::Weekday;

use crate::rows::{parse_rows, Cells};
use crate::Error;

/// Number of school days per week, Monday to Friday.
pub const DAYS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchoolDay {
  Monday,
  Tuesday,
  Wednesday,
  Thursday,
  Friday,
}

impl SchoolDay {
  pub const ALL: [SchoolDay; DAYS] = [
    SchoolDay::Monday,
    SchoolDay::Tuesday,
    SchoolDay::Wednesday,
    SchoolDay::Thursday,
    SchoolDay::Friday,
  ];

  pub fn index(self) -> usize {
    self as usize
  }

  pub fn weekday(self) -> Weekday {
    match self {
      SchoolDay::Monday => Weekday::Monday,
      SchoolDay::Tuesday => Weekday::Tuesday,
      SchoolDay::Wednesday => Weekday::Wednesday,
      SchoolDay::Thursday => Weekday::Thursday,
      SchoolDay::Friday => Weekday::Friday,
    }
  }
}

impl TryFrom<Weekday> for SchoolDay {
  type Error = Error;

  fn try_from(weekday: Weekday) -> Result<Self, Self::Error> {
    match weekday {
      Weekday::Monday => Ok(SchoolDay::Monday),
      Weekday::Tuesday => Ok(SchoolDay::Tuesday),
      Weekday::Wednesday => Ok(SchoolDay::Wednesday),
      Weekday::Thursday => Ok(SchoolDay::Thursday),
      Weekday::Friday => Ok(SchoolDay::Friday),
      Weekday::Saturday | Weekday::Sunday => Err(Error::InvalidDay(weekday)),
    }
  }
}

impl Display for SchoolDay {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Display::fmt(&self.weekday(), f)
  }
}

/// Subjects of one class, one bucket per school day.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClassRecord {
  pub days: [Vec<String>; DAYS],
}

impl ClassRecord {
  pub fn day(&self, day: SchoolDay) -> &[String] {
    &self.days[day.index()]
  }

  /// Longest day of the week, in periods.
  pub fn max_periods(&self) -> usize {
    self.days.iter().map(Vec::len).max().unwrap_or(0)
  }
}

/// Distributes the cells following the class id into day buckets.
///
/// Every empty cell closes the current day. Cells after the fifth boundary
/// are ignored.
pub fn split_days(cells: &[Option<String>]) -> [Vec<String>; DAYS] {
  let mut days: [Vec<String>; DAYS] = Default::default();
  let mut day = 0;

  for cell in cells {
    match cell {
      None => {
        day += 1;
        if day >= DAYS {
          break;
        }
      }
      Some(subject) => days[day].push(subject.clone()),
    }
  }

  days
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TimetableGrid {
  classes: BTreeMap<String, ClassRecord>,
}

impl TimetableGrid {
  pub fn parse(text: &str) -> Self {
    Self::from_rows(parse_rows(text))
  }

  pub fn from_rows(rows: impl IntoIterator<Item = Cells>) -> Self {
    let mut classes = BTreeMap::new();

    for row in rows {
      let Some((Some(class), cells)) = row.split_first() else {
        continue;
      };

      classes.insert(
        class.clone(),
        ClassRecord {
          days: split_days(cells),
        },
      );
    }

    Self { classes }
  }

  pub fn len(&self) -> usize {
    self.classes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.classes.is_empty()
  }

  /// Class ids in sorted order.
  pub fn classes(&self) -> impl Iterator<Item = &str> {
    self.classes.keys().map(String::as_str)
  }

  pub fn contains(&self, class: &str) -> bool {
    self.classes.contains_key(class)
  }

  pub fn get(&self, class: &str) -> Option<&ClassRecord> {
    self.classes.get(class)
  }

  /// Subjects of `class` on `weekday`.
  ///
  /// Weekends are rejected with [`Error::InvalidDay`]; an unknown class or an
  /// empty day yields [`Error::ParseEmpty`].
  pub fn lessons(&self, class: &str, weekday: Weekday) -> Result<&[String], Error> {
    let day = SchoolDay::try_from(weekday)?;

    match self.classes.get(class).map(|record| record.day(day)) {
      Some(lessons) if !lessons.is_empty() => Ok(lessons),
      _ => Err(Error::ParseEmpty {
        class: class.to_string(),
        day,
      }),
    }
  }

  /// Writes the grid back in its feed form, one blank cell between days.
  pub fn to_csv(&self) -> Result<String, csv::Error> {
    let mut writer = WriterBuilder::new()
      .flexible(true)
      .has_headers(false)
      .quote_style(QuoteStyle::Never)
      .from_writer(Vec::new());

    for (class, record) in &self.classes {
      let mut row = vec![class.as_str()];
      for (index, day) in record.days.iter().enumerate() {
        if index > 0 {
          row.push("");
        }
        row.extend(day.iter().map(String::as_str));
      }
      writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
  }
}

#[cfg(test)]
mod test {
  use time::Weekday;

  use super::{split_days, SchoolDay, TimetableGrid};
  use crate::Error;

  fn cells(values: &[&str]) -> Vec<Option<String>> {
    values
      .iter()
      .map(|value| (!value.is_empty()).then(|| value.to_string()))
      .collect()
  }

  #[test]
  fn no_blank_cells_means_monday_only() {
    let days = split_days(&cells(&["Math", "English", "Art"]));
    assert_eq!(days[0], vec!["Math", "English", "Art"]);
    assert!(days[1..].iter().all(Vec::is_empty));
  }

  #[test]
  fn blank_cells_advance_the_day() {
    let days = split_days(&cells(&["Math", "", "Art", "", "", "PE"]));
    assert_eq!(days[0], vec!["Math"]);
    assert_eq!(days[1], vec!["Art"]);
    assert!(days[2].is_empty());
    assert_eq!(days[3], vec!["PE"]);
    assert!(days[4].is_empty());
  }

  #[test]
  fn stops_after_five_boundaries() {
    let days = split_days(&cells(&[
      "Mo", "", "Tu", "", "We", "", "Th", "", "Fr", "", "Sa", "", "Su",
    ]));
    assert_eq!(days.map(|day| day.join("|")), ["Mo", "Tu", "We", "Th", "Fr"]);
  }

  #[test]
  fn skips_rows_without_class() {
    let grid = TimetableGrid::parse(",Math,,Art\nHR21,Math\n");
    assert_eq!(grid.classes().collect::<Vec<_>>(), vec!["HR21"]);
  }

  #[test]
  fn later_rows_replace_earlier_ones() {
    let grid = TimetableGrid::parse("HR21,Math\nHR21,Art\n");
    assert_eq!(grid.lessons("HR21", Weekday::Monday).unwrap(), ["Art"]);
  }

  #[test]
  fn classes_are_sorted() {
    let grid = TimetableGrid::parse("HR23,A\nHR21,B\nHR22,C\n");
    assert_eq!(
      grid.classes().collect::<Vec<_>>(),
      vec!["HR21", "HR22", "HR23"]
    );
  }

  #[test]
  fn lessons_lookup() {
    let grid = TimetableGrid::parse("HR21,Math,English,,Art\n");

    assert_eq!(
      grid.lessons("HR21", Weekday::Tuesday).unwrap(),
      ["Art".to_string()]
    );
    assert!(matches!(
      grid.lessons("HR21", Weekday::Wednesday),
      Err(Error::ParseEmpty {
        day: SchoolDay::Wednesday,
        ..
      })
    ));
    assert!(matches!(
      grid.lessons("HR99", Weekday::Monday),
      Err(Error::ParseEmpty { .. })
    ));
    assert!(matches!(
      grid.lessons("HR21", Weekday::Saturday),
      Err(Error::InvalidDay(Weekday::Saturday))
    ));
  }

  #[test]
  fn serialized_grid_parses_back() {
    let text = "HR21,Math,English,,Art,,Music,PE,,,Science\r\nHR22,,,,,History\r\n";
    let grid = TimetableGrid::parse(text);
    let written = grid.to_csv().unwrap();

    assert_eq!(TimetableGrid::parse(&written), grid);
    assert_eq!(
      written,
      "HR21,Math,English,,Art,,Music,PE,,,Science\nHR22,,,,,History\n"
    );
  }

  #[test]
  fn stray_quote_keeps_later_classes() {
    let grid = TimetableGrid::parse("HR21,\"Math,,Art\nHR22,PE\nHR23,Music\n");

    assert_eq!(grid.classes().collect::<Vec<_>>(), ["HR21", "HR22", "HR23"]);
    assert_eq!(grid.get("HR21").unwrap().day(SchoolDay::Monday), ["\"Math"]);
    assert_eq!(grid.get("HR21").unwrap().day(SchoolDay::Tuesday), ["Art"]);
    assert_eq!(grid.get("HR22").unwrap().day(SchoolDay::Monday), ["PE"]);
    assert_eq!(grid.to_csv().unwrap().lines().next(), Some("HR21,\"Math,,Art"));
  }

  #[test]
  fn max_periods_uses_longest_day() {
    let grid = TimetableGrid::parse("HR21,A,B,,C,,D,E,F\n");
    assert_eq!(grid.get("HR21").unwrap().max_periods(), 3);
  }
}

use std::sync::Arc;

use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, Url};
use time::{OffsetDateTime, Weekday};
use tokio::sync::RwLock;
use tracing::info;

use crate::calendar::{parse_events, CalendarEvent};
use crate::grid::{SchoolDay, TimetableGrid};

pub mod calendar;
pub mod grid;
pub mod period;
mod rows;
pub mod selection;
#[cfg(test)]
mod test;

pub use reqwest;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("unable to fetch {url}: {source}")]
  FetchFailed {
    url: Url,
    #[source]
    source: reqwest::Error,
  },
  #[error("no timetable for {class} on {day}")]
  ParseEmpty { class: String, day: SchoolDay },
  #[error("{0} is not a school day")]
  InvalidDay(Weekday),
}

/// Fetches the timetable and calendar feeds and keeps the last good copy of each.
pub struct Feeds {
  client: Client,
  timetable_url: Url,
  calendar_url: Url,
  timetable: RwLock<Option<Snapshot<TimetableGrid>>>,
  calendar: RwLock<Option<Snapshot<Vec<CalendarEvent>>>>,
}

/// One successfully fetched feed. The value is replaced, never mutated.
#[derive(Debug)]
pub struct Snapshot<T> {
  pub last_checked: OffsetDateTime,
  pub last_modified: OffsetDateTime,
  pub value: Arc<T>,
}

impl<T> Clone for Snapshot<T> {
  fn clone(&self) -> Self {
    Self {
      last_checked: self.last_checked,
      last_modified: self.last_modified,
      value: self.value.clone(),
    }
  }
}

impl Feeds {
  pub fn new(timetable_url: Url, calendar_url: Url) -> Self {
    Self {
      client: Client::new(),
      timetable_url,
      calendar_url,
      timetable: RwLock::new(None),
      calendar: RwLock::new(None),
    }
  }

  /// Last good timetable, `None` until the first successful fetch.
  pub async fn timetable(&self) -> Option<Snapshot<TimetableGrid>> {
    self.timetable.read().await.clone()
  }

  /// Last good event list, `None` until the first successful fetch.
  pub async fn calendar(&self) -> Option<Snapshot<Vec<CalendarEvent>>> {
    self.calendar.read().await.clone()
  }

  /// Refreshes the timetable, returning whether its content changed.
  pub async fn update_timetable(&self) -> Result<bool, Error> {
    let text = self.fetch(&self.timetable_url).await?;
    let grid = TimetableGrid::parse(&text);

    info!("Parsed timetable with {} classes", grid.len());

    Ok(replace(&self.timetable, grid).await)
  }

  /// Refreshes the event list, returning whether its content changed.
  pub async fn update_calendar(&self) -> Result<bool, Error> {
    let text = self.fetch(&self.calendar_url).await?;
    let events = parse_events(&text);

    info!("Parsed calendar with {} events", events.len());

    Ok(replace(&self.calendar, events).await)
  }

  async fn fetch(&self, url: &Url) -> Result<String, Error> {
    let failed = |source| Error::FetchFailed {
      url: url.clone(),
      source,
    };

    let response = self
      .client
      .get(url.clone())
      .header(CACHE_CONTROL, "no-store")
      .send()
      .await
      .and_then(|response| response.error_for_status())
      .map_err(failed)?;

    let text = response.text().await.map_err(failed)?;

    info!("Crawled {}, {} bytes", url, text.len());

    Ok(text)
  }
}

async fn replace<T: PartialEq>(slot: &RwLock<Option<Snapshot<T>>>, value: T) -> bool {
  let now = OffsetDateTime::now_utc();
  let mut data = slot.write().await;

  // check if there is a difference
  if let Some(data) = data.as_mut() {
    if *data.value == value {
      data.last_checked = now;
      return false;
    }
  }

  *data = Some(Snapshot {
    last_checked: now,
    last_modified: now,
    value: Arc::new(value),
  });

  true
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use include_dir::{include_dir, Dir};
use sailfish::TemplateOnce;
use serde::{Deserialize, Serialize};
use time::{Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tower_http::trace::TraceLayer;
use tracing::error;

use clab_timetable::calendar::MonthGrid;
use clab_timetable::grid::TimetableGrid;
use clab_timetable::period::PeriodSchedule;
use clab_timetable::selection::{
  restore_class, CLASS_COOKIE, COOKIE_MAX_AGE_DAYS, STORED_CLASS_COOKIE,
};
use clab_timetable::{Feeds, Snapshot};

use crate::render::{
  self, resolve_selection, CalendarTemplate, HomeTemplate, Requested, ScheduleTemplate,
  EVENTS_UNAVAILABLE, TIMETABLE_UNAVAILABLE,
};

static ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

#[derive(Clone)]
pub struct AppState {
  feeds: Arc<Feeds>,
  schedule: Arc<PeriodSchedule>,
  offset: UtcOffset,
}

impl AppState {
  pub fn new(feeds: Arc<Feeds>, schedule: PeriodSchedule, offset: UtcOffset) -> Self {
    Self {
      feeds,
      schedule: Arc::new(schedule),
      offset,
    }
  }

  /// Wall-clock time at the school.
  fn now(&self) -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc().to_offset(self.offset);
    PrimitiveDateTime::new(now.date(), now.time())
  }
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/", get(home))
    .route("/schedule", get(schedule))
    .route("/calendar", get(calendar))
    .route("/api/timetable", get(api_timetable))
    .route("/api/events", get(api_events))
    .route("/sw.js", get(service_worker))
    .route("/static/*path", get(asset))
    .with_state(state)
    .layer(TraceLayer::new_for_http())
}

pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    error!("Error handling request: {:#}", self.0);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
  }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
  fn from(err: E) -> Self {
    Self(err.into())
  }
}

#[derive(Debug, Default, Deserialize)]
struct SelectionQuery {
  class: Option<String>,
  day: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MonthQuery {
  year: Option<i32>,
  month: Option<u8>,
}

async fn home(
  State(state): State<AppState>,
  Query(query): Query<SelectionQuery>,
  headers: HeaderMap,
) -> Result<Response, AppError> {
  let now = state.now();
  let timetable = state.feeds.timetable().await;
  let calendar = state.feeds.calendar().await;
  let grid = timetable.as_ref().map(|snapshot| snapshot.value.as_ref());

  let cookie = read_cookie(&headers, CLASS_COOKIE);
  let stored = read_cookie(&headers, STORED_CLASS_COOKIE);
  let requested = Requested {
    class: query.class.as_deref(),
    day: query.day.as_deref(),
    cookie: cookie.as_deref(),
    stored: stored.as_deref(),
  };
  let selection = grid.and_then(|grid| resolve_selection(grid, &requested, now.weekday()));

  let page = render::home(
    now,
    &state.schedule,
    grid,
    selection.as_ref(),
    calendar.as_ref().map(|snapshot| snapshot.value.as_slice()),
  );
  let html = HomeTemplate { page: &page }.render_once()?;

  Ok(with_selection(
    Html(html).into_response(),
    selection.as_ref().map(|selection| selection.class.as_str()),
  ))
}

async fn schedule(
  State(state): State<AppState>,
  Query(query): Query<SelectionQuery>,
  headers: HeaderMap,
) -> Result<Response, AppError> {
  let timetable = state.feeds.timetable().await;
  let grid = timetable.as_ref().map(|snapshot| snapshot.value.as_ref());

  let cookie = read_cookie(&headers, CLASS_COOKIE);
  let class =
    grid.and_then(|grid| schedule_class(grid, query.class.as_deref(), cookie.as_deref()));

  let page = render::schedule(&state.schedule, grid, class);
  let html = ScheduleTemplate { page: &page }.render_once()?;

  Ok(with_selection(Html(html).into_response(), class))
}

/// An empty `class` parameter is the "no class" choice and skips the cookie.
fn schedule_class<'a>(
  grid: &'a TimetableGrid,
  requested: Option<&'a str>,
  cookie: Option<&'a str>,
) -> Option<&'a str> {
  match requested {
    Some("") => None,
    Some(class) if grid.contains(class) => Some(class),
    _ => restore_class(grid, cookie, None),
  }
}

async fn calendar(
  State(state): State<AppState>,
  Query(query): Query<MonthQuery>,
) -> Result<Response, AppError> {
  let today = state.now().date();

  let month = match query.month.map(Month::try_from) {
    None => today.month(),
    Some(Ok(month)) => month,
    Some(Err(_)) => return Ok(StatusCode::BAD_REQUEST.into_response()),
  };
  let Ok(grid) = MonthGrid::new(query.year.unwrap_or(today.year()), month) else {
    return Ok(StatusCode::BAD_REQUEST.into_response());
  };

  let events = state.feeds.calendar().await;
  let page = render::calendar(
    &grid,
    today,
    events.as_ref().map(|snapshot| snapshot.value.as_slice()),
  );
  let html = CalendarTemplate { page: &page }.render_once()?;

  Ok(Html(html).into_response())
}

#[derive(Serialize)]
struct FeedBody<'a, T> {
  last_checked: OffsetDateTime,
  last_modified: OffsetDateTime,
  data: &'a T,
}

fn feed_response<T: Serialize>(
  snapshot: Option<Snapshot<T>>,
  unavailable: &'static str,
) -> Response {
  match snapshot {
    Some(snapshot) => Json(FeedBody {
      last_checked: snapshot.last_checked,
      last_modified: snapshot.last_modified,
      data: snapshot.value.as_ref(),
    })
    .into_response(),
    None => (StatusCode::SERVICE_UNAVAILABLE, unavailable).into_response(),
  }
}

async fn api_timetable(State(state): State<AppState>) -> Response {
  feed_response(state.feeds.timetable().await, TIMETABLE_UNAVAILABLE)
}

async fn api_events(State(state): State<AppState>) -> Response {
  feed_response(state.feeds.calendar().await, EVENTS_UNAVAILABLE)
}

async fn service_worker() -> Response {
  serve_asset("sw.js")
}

async fn asset(Path(path): Path<String>) -> Response {
  serve_asset(&path)
}

fn serve_asset(path: &str) -> Response {
  match ASSETS.get_file(path) {
    Some(file) => ([(CONTENT_TYPE, content_type(path))], file.contents()).into_response(),
    None => StatusCode::NOT_FOUND.into_response(),
  }
}

fn content_type(path: &str) -> &'static str {
  match path.rsplit_once('.').map(|(_, extension)| extension) {
    Some("css") => "text/css; charset=utf-8",
    Some("js") => "text/javascript; charset=utf-8",
    Some("html") => "text/html; charset=utf-8",
    Some("png") => "image/png",
    _ => "application/octet-stream",
  }
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
  headers
    .get_all(COOKIE)
    .iter()
    .filter_map(|value| value.to_str().ok())
    .flat_map(|value| value.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(key, _)| *key == name)
    .map(|(_, value)| match urlencoding::decode(value) {
      Ok(decoded) => decoded.into_owned(),
      Err(_) => value.to_string(),
    })
}

/// Echoes the selected class back to the client.
fn with_selection(mut response: Response, class: Option<&str>) -> Response {
  let Some(class) = class else {
    return response;
  };

  for name in [CLASS_COOKIE, STORED_CLASS_COOKIE] {
    let cookie = format!(
      "{}={}; Max-Age={}; Path=/; SameSite=Lax",
      name,
      urlencoding::encode(class),
      COOKIE_MAX_AGE_DAYS * 24 * 60 * 60
    );

    if let Ok(value) = HeaderValue::from_str(&cookie) {
      response.headers_mut().append(SET_COOKIE, value);
    }
  }

  response
}

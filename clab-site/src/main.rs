use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use time::{OffsetDateTime, UtcOffset};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use clab_timetable::period::PeriodSchedule;
use clab_timetable::reqwest::Url;
use clab_timetable::Feeds;

use crate::web::{router, AppState};

mod render;
mod web;

#[derive(Parser)]
#[command(author, version, about, long_about)]
struct Args {
  #[arg(long, short, env = "CLAB_TIMETABLE_URL")]
  timetable_url: Url,
  #[arg(long, short, env = "CLAB_CALENDAR_URL")]
  calendar_url: Url,
  #[arg(long, short, env = "CLAB_LISTEN", default_value = "127.0.0.1:8080")]
  listen: SocketAddr,
  /// Hours east of UTC used for the school's wall clock
  #[arg(
    long,
    env = "CLAB_UTC_OFFSET",
    default_value_t = 9,
    allow_negative_numbers = true
  )]
  utc_offset: i8,
  /// Minutes between feed refreshes, aligned to the hour
  #[arg(
    long,
    env = "CLAB_REFRESH_MINUTES",
    default_value_t = 15,
    value_parser = clap::value_parser!(u64).range(1..=60)
  )]
  refresh_minutes: u64,
  #[arg(long, env = "CLAB_SENTRY_DSN")]
  sentry_dsn: Option<String>,
}

#[derive(Clone, Copy, Debug)]
enum Feed {
  Timetable,
  Calendar,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let args = Args::parse();

  tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer())
    .with(sentry_tracing::layer())
    .init();

  let _sentry = sentry::init((
    args.sentry_dsn.clone(),
    sentry::ClientOptions {
      release: sentry::release_name!(),
      ..Default::default()
    },
  ));

  let offset = UtcOffset::from_hms(args.utc_offset, 0, 0)?;
  let feeds = Arc::new(Feeds::new(
    args.timetable_url.clone(),
    args.calendar_url.clone(),
  ));

  tokio::spawn(refresh(feeds.clone(), Feed::Timetable, args.refresh_minutes));
  tokio::spawn(refresh(feeds.clone(), Feed::Calendar, args.refresh_minutes));

  let state = AppState::new(feeds, PeriodSchedule::default(), offset);
  let listener = TcpListener::bind(args.listen).await?;

  info!("Listening on http://{}", args.listen);

  axum::serve(listener, router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  Ok(())
}

/// Keeps one feed up to date. A failed attempt is logged and retried at the next slot.
async fn refresh(feeds: Arc<Feeds>, feed: Feed, interval: u64) {
  loop {
    let result = match feed {
      Feed::Timetable => feeds.update_timetable().await,
      Feed::Calendar => feeds.update_calendar().await,
    };

    match result {
      Err(err) => error!("Error refreshing {:?} feed: {}", feed, err),
      Ok(false) => info!("{:?} feed unchanged", feed),
      Ok(true) => info!("Detected changes in {:?} feed", feed),
    }

    await_next_execution(interval).await;
  }
}

async fn await_next_execution(interval: u64) {
  let now = OffsetDateTime::now_utc();

  let now_min = now.minute() as u64;
  let now_min_to_last = now_min % interval;
  let now_min_to_next = interval - now_min_to_last;
  let now_sec_to_next = now_min_to_next * 60;
  let now_sec_to_next_prec = now_sec_to_next - now.second() as u64;
  let duration = Duration::from_secs(now_sec_to_next_prec);

  let sleep_until = Instant::now() + duration;
  info!(
    "Next refresh in {:0>2}:{:0>2} minutes",
    now_sec_to_next_prec / 60,
    now_sec_to_next_prec % 60
  );
  tokio::time::sleep_until(sleep_until).await;
}

async fn shutdown_signal() {
  if let Err(err) = tokio::signal::ctrl_c().await {
    error!("Unable to listen for shutdown signal: {}", err);
    std::future::pending::<()>().await;
  }

  info!("Shutting down");
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use reqwest::Url;
use time::Weekday;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::{Error, Feeds};

const TIMETABLE: &str = "HR21,Math,English,,Art\nHR22,PE,,Music\n";
const CALENDAR: &str = "2025/01/05,Sports day\n2025/1/7,Exams\n";

type Routes = Arc<Mutex<HashMap<String, (u16, String)>>>;

/// Minimal HTTP server answering each path with a fixed status and body.
async fn serve(routes: Routes) -> Url {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();

  tokio::spawn(async move {
    while let Ok((mut stream, _)) = listener.accept().await {
      let routes = routes.clone();
      tokio::spawn(async move {
        let mut buf = vec![0; 8192];
        let read = stream.read(&mut buf).await.unwrap_or(0);
        let request = String::from_utf8_lossy(&buf[..read]).to_string();
        let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

        let (status, body) = routes
          .lock()
          .unwrap()
          .get(&path)
          .cloned()
          .unwrap_or((404, String::new()));

        let response = format!(
          "HTTP/1.1 {status} Status\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
          body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
      });
    }
  });

  Url::parse(&format!("http://{addr}/")).unwrap()
}

fn routes(timetable: (u16, &str), calendar: (u16, &str)) -> Routes {
  Arc::new(Mutex::new(HashMap::from([
    (
      "/timetable.csv".to_string(),
      (timetable.0, timetable.1.to_string()),
    ),
    (
      "/calendar.csv".to_string(),
      (calendar.0, calendar.1.to_string()),
    ),
  ])))
}

async fn feeds(routes: Routes) -> Feeds {
  let base = serve(routes).await;
  Feeds::new(
    base.join("timetable.csv").unwrap(),
    base.join("calendar.csv").unwrap(),
  )
}

#[tokio::test]
async fn loads_both_feeds() {
  let feeds = feeds(routes((200, TIMETABLE), (200, CALENDAR))).await;

  assert!(feeds.update_timetable().await.unwrap());
  assert!(feeds.update_calendar().await.unwrap());

  let grid = feeds.timetable().await.unwrap().value;
  assert_eq!(grid.classes().collect::<Vec<_>>(), vec!["HR21", "HR22"]);
  assert_eq!(
    grid.lessons("HR22", Weekday::Tuesday).unwrap(),
    ["Music".to_string()]
  );

  let events = feeds.calendar().await.unwrap().value;
  assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn feeds_fail_independently() {
  let feeds = feeds(routes((500, "boom"), (200, CALENDAR))).await;

  assert!(matches!(
    feeds.update_timetable().await,
    Err(Error::FetchFailed { .. })
  ));
  assert!(feeds.update_calendar().await.unwrap());

  assert!(feeds.timetable().await.is_none());
  assert!(feeds.calendar().await.is_some());
}

#[tokio::test]
async fn unchanged_content_is_not_a_change() {
  let routes = routes((200, TIMETABLE), (200, CALENDAR));
  let feeds = feeds(routes.clone()).await;

  assert!(feeds.update_timetable().await.unwrap());
  let first = feeds.timetable().await.unwrap();

  assert!(!feeds.update_timetable().await.unwrap());
  let second = feeds.timetable().await.unwrap();
  assert_eq!(first.last_modified, second.last_modified);
  assert!(Arc::ptr_eq(&first.value, &second.value));

  routes.lock().unwrap().insert(
    "/timetable.csv".to_string(),
    (200, "HR21,History\n".to_string()),
  );

  assert!(feeds.update_timetable().await.unwrap());
  let third = feeds.timetable().await.unwrap();
  assert!(!Arc::ptr_eq(&first.value, &third.value));
  // readers holding the old snapshot still see the complete old grid
  assert_eq!(first.value.len(), 2);
  assert_eq!(third.value.len(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_last_good_copy() {
  let routes = routes((200, TIMETABLE), (200, CALENDAR));
  let feeds = feeds(routes.clone()).await;

  assert!(feeds.update_timetable().await.unwrap());

  routes
    .lock()
    .unwrap()
    .insert("/timetable.csv".to_string(), (503, String::new()));

  assert!(feeds.update_timetable().await.is_err());
  assert_eq!(feeds.timetable().await.unwrap().value.len(), 2);
}

#[tokio::test]
async fn unreachable_host_is_a_fetch_failure() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let base = Url::parse(&format!("http://{addr}/")).unwrap();
  let feeds = Feeds::new(
    base.join("timetable.csv").unwrap(),
    base.join("calendar.csv").unwrap(),
  );

  match feeds.update_calendar().await {
    Err(Error::FetchFailed { url, .. }) => assert_eq!(url.path(), "/calendar.csv"),
    other => panic!("expected fetch failure, got {other:?}"),
  }
}

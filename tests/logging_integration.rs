use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::Body,
    http::{self, Request, StatusCode},
};
use serde_json::json;
use slow_echo::{server::build_app, utils::GlobalConfig};
use tower::ServiceExt;

const ECHO_DELAY: Duration = Duration::from_secs(5);

/// Collects everything the fmt subscriber writes.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_echo_logs_in_order_around_delay() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let response = build_app(GlobalConfig::default()).oneshot(
        Request::builder()
            .uri("/echo")
            .method(http::Method::POST)
            .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(json!({ "message": "ping" }).to_string()))
            .unwrap(),
    );
    tokio::pin!(response);

    // run the handler up to its sleep, stopping just short of the delay
    let pending =
        tokio::time::timeout(ECHO_DELAY - Duration::from_millis(1), &mut response).await;
    assert!(pending.is_err());

    let before_delay = logs.contents();
    let received = before_delay.find("Received message: ping").unwrap();
    let processing = before_delay.find("Processing message...").unwrap();
    assert!(received < processing);
    assert!(!before_delay.contains("Processing complete"));

    tokio::time::advance(Duration::from_millis(1)).await;
    let response = response.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let after_delay = logs.contents();
    let complete = after_delay.find("Processing complete").unwrap();
    assert!(processing < complete);
    assert_eq!(after_delay.matches("Received message").count(), 1);
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use tradeflow_health::{
    FeedError, HealthMonitor, HealthStatus, HealthTracker, HttpTelemetryFeed, TelemetryFeed,
};

#[derive(Clone, Default)]
struct Counters {
    polls: Arc<AtomicU64>,
}

async fn telemetry(State(c): State<Counters>, headers: HeaderMap) -> impl IntoResponse {
    if headers.get("authorization").is_none() {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }
    let n = c.polls.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "okCount": 10 * n,
        "failCount": 0,
        "lastUpdatedAt": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

async fn broken() -> impl IntoResponse {
    Json(json!({"ok": "yes"}))
}

struct TestServer {
    base_url: String,
    counters: Counters,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let counters = Counters::default();
        let app = Router::new()
            .route("/fx/telemetry", get(telemetry))
            .route("/fx/broken", get(broken))
            .with_state(counters.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            counters,
            handle,
        }
    }

    fn feed(&self, path: &str, token: Option<&str>) -> HttpTelemetryFeed {
        HttpTelemetryFeed::new(
            format!("{}{}", self.base_url, path),
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn reads_cumulative_counters() {
    let srv = TestServer::spawn().await;
    let feed = srv.feed("/fx/telemetry", Some("t0k3n"));

    let first = feed.read().await.unwrap();
    let second = feed.read().await.unwrap();
    assert_eq!(first.ok_count, 10);
    assert_eq!(second.ok_count, 20);
    assert!(second.last_updated_at.is_some());
}

#[tokio::test]
async fn http_errors_are_typed() {
    let srv = TestServer::spawn().await;

    let err = srv.feed("/fx/telemetry", None).read().await.unwrap_err();
    assert_eq!(
        err,
        FeedError::Status {
            status: 401,
            body: "missing token".into()
        }
    );

    let err = srv.feed("/fx/broken", None).read().await.unwrap_err();
    assert!(matches!(err, FeedError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn monitor_over_http_stays_healthy() {
    let srv = TestServer::spawn().await;
    let feed = Arc::new(srv.feed("/fx/telemetry", Some("t0k3n")));
    let tracker = HealthTracker::new(Utc::now());

    let handle = HealthMonitor::spawn(feed, tracker.clone(), Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(handle.latest().status, HealthStatus::Healthy);
    handle.shutdown().await;

    let polls = srv.counters.polls.load(Ordering::SeqCst);
    assert!(polls >= 2, "only {polls} polls");
    assert_eq!(tracker.snapshot().ok_count, 10 * polls);
}

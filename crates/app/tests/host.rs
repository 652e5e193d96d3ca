use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};

use tradeflow_app::{AppConfig, AppState};
use tradeflow_core::Locale;
use tradeflow_health::{HealthStatus, HealthTracker, HttpTelemetryFeed};
use tradeflow_search::in_memory::ScriptedPrompter;
use tradeflow_search::{
    DispatchOutcome, DispatchState, LocaleResolver, SearchApi, SearchInput, SearchResult,
};

#[derive(Clone, Default)]
struct Hits {
    search: Arc<AtomicU64>,
    telemetry: Arc<AtomicU64>,
}

async fn quick_search(State(hits): State<Hits>, Json(body): Json<Value>) -> Json<Value> {
    hits.search.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "results": [{"id": 1, "name": format!("{} ({})", body["q"].as_str().unwrap_or_default(), body["currency"].as_str().unwrap_or_default())}]
    }))
}

async fn qr_scan(State(hits): State<Hits>) -> Json<Value> {
    hits.search.fetch_add(1, Ordering::SeqCst);
    Json(json!({"value": "should never be reached"}))
}

async fn telemetry(State(hits): State<Hits>) -> Json<Value> {
    let n = hits.telemetry.fetch_add(1, Ordering::SeqCst) + 1;
    // Every refresh after the first fails.
    Json(json!({
        "okCount": 1,
        "failCount": n - 1,
        "lastUpdatedAt": Utc::now().to_rfc3339(),
    }))
}

struct TestServer {
    base_url: String,
    hits: Hits,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let hits = Hits::default();
        let app = Router::new()
            .route("/search/quick-search", post(quick_search))
            .route("/search/qr-scan", post(qr_scan))
            .route("/fx/telemetry", get(telemetry))
            .with_state(hits.clone());

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
            hits,
            handle,
        }
    }

    fn app(&self) -> AppState {
        let mut config = AppConfig::default().with_api_url(&self.base_url).unwrap();
        config.health_poll_interval = Duration::from_millis(20);

        let api = Arc::new(SearchApi::new(config.api_config()).unwrap());
        let feed = Arc::new(
            HttpTelemetryFeed::new(config.fx_telemetry_url.clone(), None, Duration::from_secs(5))
                .unwrap(),
        );
        let locale = LocaleResolver::new(Locale::new("en", "GB", "GBP").ok());
        AppState::assemble(
            config,
            api,
            feed,
            Arc::new(ScriptedPrompter::deny_all()),
            locale,
            HealthTracker::new(Utc::now()),
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn screen_searches_with_locale_and_respects_denied_camera() {
    let srv = TestServer::spawn().await;
    let app = srv.app();
    let screen = app.open_screen();

    let outcome = screen.execute("quick_search", SearchInput::text("wool coat")).await;
    let DispatchOutcome::Completed(SearchResult::QuickSearch(r)) = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert_eq!(r.results[0].name, "wool coat (GBP)");

    let outcome = screen
        .execute("qr_scan", SearchInput::default().with_image(vec![1, 2, 3]))
        .await;
    assert!(matches!(outcome, DispatchOutcome::PermissionRequired(_)));
    assert_eq!(screen.view().session.state, DispatchState::Idle);
    assert_eq!(srv.hits.search.load(Ordering::SeqCst), 1);

    app.shutdown().await;
}

#[tokio::test]
async fn closing_a_screen_leaves_health_monitor_running() {
    let srv = TestServer::spawn().await;
    let app = srv.app();

    let screen = app.open_screen();
    screen.close();
    drop(screen);

    let before = srv.hits.telemetry.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(srv.hits.telemetry.load(Ordering::SeqCst) > before);

    // 1 ok and a growing run of failures ends up critical, shown as advisory.
    let mut updates = app.health_updates();
    let critical = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if updates.borrow_and_update().status == HealthStatus::Critical {
                break;
            }
            updates.changed().await.unwrap();
        }
    })
    .await;
    assert!(critical.is_ok());

    let screen = app.open_screen();
    let advisory = screen.view().advisory.expect("advisory attached");
    assert!(advisory.pulses);

    app.shutdown().await;
}

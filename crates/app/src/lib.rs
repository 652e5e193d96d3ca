//! Host shell wiring the search dispatcher and the FX health monitor.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use tradeflow_core::Locale;
use tradeflow_health::{
    FeedError, HealthMonitor, HealthReport, HealthTracker, HttpTelemetryFeed, MonitorHandle,
    TelemetryFeed,
};
use tradeflow_search::{
    BackendError, DispatcherDeps, LocaleResolver, PermissionPrompter, SearchApi, SearchBackend,
    ToolRegistry,
};

pub mod config;
pub mod prompter;
pub mod screen;

pub use config::{AppConfig, ConfigError};
pub use prompter::ConsolePrompter;
pub use screen::{ScreenView, SearchScreen};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("search backend: {0}")]
    Backend(#[from] BackendError),
    #[error("telemetry feed: {0}")]
    Feed(#[from] FeedError),
}

/// Process-wide services. Screens come and go; these live until `shutdown`.
pub struct AppState {
    pub config: AppConfig,
    pub api: Arc<SearchApi>,
    deps: DispatcherDeps,
    monitor: MonitorHandle,
}

impl AppState {
    /// Connect to the configured services and start the health monitor.
    ///
    /// Must run inside a tokio runtime.
    pub fn start(
        config: AppConfig,
        prompter: Arc<dyn PermissionPrompter>,
    ) -> Result<Self, StartupError> {
        let api = Arc::new(SearchApi::new(config.api_config())?);
        let feed = Arc::new(HttpTelemetryFeed::new(
            config.fx_telemetry_url.clone(),
            config.auth_token.clone(),
            config.request_timeout,
        )?);
        let locale = config.locale_resolver(tradeflow_search::locale::detect_with(|name| {
            std::env::var(name).ok()
        }));

        tracing::info!(
            api_url = %config.api_url,
            fx_telemetry_url = %config.fx_telemetry_url,
            locale = %locale.resolve(),
            authenticated = config.auth_token.is_some(),
            "starting tradeflow"
        );

        let tracker = tradeflow_health::global().clone();
        Ok(Self::assemble(config, api, feed, prompter, locale, tracker))
    }

    /// Wire already-built collaborators.
    pub fn assemble(
        config: AppConfig,
        api: Arc<SearchApi>,
        feed: Arc<dyn TelemetryFeed>,
        prompter: Arc<dyn PermissionPrompter>,
        locale: LocaleResolver,
        tracker: HealthTracker,
    ) -> Self {
        let monitor = HealthMonitor::spawn(feed, tracker, config.health_poll_interval);
        let backend: Arc<dyn SearchBackend> = api.clone();
        let deps = DispatcherDeps {
            registry: ToolRegistry::builtin(),
            locale,
            backend,
            prompter,
        };
        Self {
            config,
            api,
            deps,
            monitor,
        }
    }

    pub fn open_screen(&self) -> SearchScreen {
        SearchScreen::open(self.deps.clone(), self.monitor.subscribe())
    }

    /// Locale stamped on outgoing requests.
    pub fn locale(&self) -> Locale {
        self.deps.locale.resolve()
    }

    pub fn health(&self) -> HealthReport {
        self.monitor.latest()
    }

    pub fn health_updates(&self) -> watch::Receiver<HealthReport> {
        self.monitor.subscribe()
    }

    pub async fn shutdown(self) {
        self.monitor.shutdown().await;
        tracing::info!("tradeflow stopped");
    }
}

//! The search screen host: one dispatcher session plus advisory FX health.

use serde::Serialize;
use tokio::sync::watch;

use tradeflow_health::{HealthReport, HealthStatus};
use tradeflow_search::{
    DispatchOutcome, DispatcherDeps, SearchInput, SearchSession, SessionView, ToolDescriptor,
};

/// What the screen renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenView {
    #[serde(flatten)]
    pub session: SessionView,
    /// Present only while FX health is degraded. Never blocks a search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<HealthReport>,
}

pub struct SearchScreen {
    session: SearchSession,
    health: watch::Receiver<HealthReport>,
}

impl SearchScreen {
    pub fn open(deps: DispatcherDeps, health: watch::Receiver<HealthReport>) -> Self {
        let session = SearchSession::new(deps);
        tracing::info!(session = %session.id(), "search screen opened");
        Self { session, health }
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        self.session.registry().list()
    }

    pub async fn execute(&self, tool_id: &str, input: SearchInput) -> DispatchOutcome {
        self.session.execute(tool_id, input).await
    }

    /// Teardown: cancels any in-flight search. The health monitor keeps running.
    pub fn close(&self) {
        tracing::info!(session = %self.session.id(), "search screen closed");
        self.session.close();
    }

    pub fn view(&self) -> ScreenView {
        let health = self.health.borrow();
        ScreenView {
            session: self.session.view(),
            advisory: (health.status != HealthStatus::Healthy).then(|| health.clone()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.session.subscribe()
    }
}

//! Background health poller.
//!
//! Runs independently of any search session: tearing down a session never
//! stops it, only [`MonitorHandle::shutdown`] does.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

use crate::classifier::{HealthReport, HealthStatus, classify};
use crate::feed::TelemetryFeed;
use crate::snapshot::HealthTracker;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct HealthMonitor;

impl HealthMonitor {
    /// Start polling `feed` every `interval`. The first poll happens immediately.
    pub fn spawn(
        feed: Arc<dyn TelemetryFeed>,
        tracker: HealthTracker,
        interval: Duration,
    ) -> MonitorHandle {
        let initial = classify(&tracker.snapshot(), Utc::now());
        let (tx, rx) = watch::channel(initial);
        let shutdown = Arc::new(Notify::new());
        let stop = shutdown.clone();

        let task = tokio::spawn(async move {
            tracing::info!(interval_ms = interval.as_millis() as u64, "health monitor started");

            let mut ticker = tokio::time::interval(interval.max(MIN_POLL_INTERVAL));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut last_status = tx.borrow().status;

            loop {
                tokio::select! {
                    _ = stop.notified() => {
                        tracing::info!("health monitor received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = Self::tick_once(feed.as_ref(), &tracker, Utc::now()).await;
                        log_transition(last_status, &report);
                        last_status = report.status;
                        tx.send_replace(report);
                    }
                }
            }

            tracing::info!("health monitor stopped");
        });

        MonitorHandle {
            reports: rx,
            shutdown,
            task,
        }
    }

    /// One poll: read the feed, fold the reading, classify at `now`.
    ///
    /// A feed error leaves the snapshot untouched; the data simply keeps aging.
    pub async fn tick_once(
        feed: &dyn TelemetryFeed,
        tracker: &HealthTracker,
        now: DateTime<Utc>,
    ) -> HealthReport {
        let snapshot = match feed.read().await {
            Ok(reading) => tracker.apply_reading(reading, now),
            Err(e) => {
                tracing::warn!(error = %e, "telemetry poll failed");
                tracker.snapshot()
            }
        };
        classify(&snapshot, now)
    }
}

fn log_transition(previous: HealthStatus, report: &HealthReport) {
    if previous == report.status {
        tracing::debug!(status = %report.status, age_secs = report.age_secs, "fx health unchanged");
        return;
    }
    match report.status {
        HealthStatus::Healthy => {
            tracing::info!(from = %previous, description = %report.description, "fx health recovered")
        }
        HealthStatus::Warning => {
            tracing::warn!(from = %previous, description = %report.description, "fx health degraded")
        }
        HealthStatus::Critical => {
            tracing::error!(from = %previous, description = %report.description, "fx health critical")
        }
    }
}

/// Handle to a running monitor.
pub struct MonitorHandle {
    reports: watch::Receiver<HealthReport>,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn subscribe(&self) -> watch::Receiver<HealthReport> {
        self.reports.clone()
    }

    pub fn latest(&self) -> HealthReport {
        self.reports.borrow().clone()
    }

    /// Stop the poller and wait for it to exit.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "health monitor task ended abnormally");
        }
    }
}

//! FX feed health: counters, classification and the background poller.

pub mod classifier;
pub mod feed;
pub mod in_memory;
pub mod monitor;
pub mod snapshot;

pub use classifier::{HealthReport, HealthStatus, classify};
pub use feed::{FeedError, HttpTelemetryFeed, TelemetryFeed, TelemetryReading};
pub use monitor::{DEFAULT_POLL_INTERVAL, HealthMonitor, MonitorHandle};
pub use snapshot::{HealthSnapshot, HealthTracker, global};

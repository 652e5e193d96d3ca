//! Process-scoped FX feed counters.
//!
//! Writers go through [`HealthTracker`]; readers take a copy of the
//! [`HealthSnapshot`] and classify it. Nothing derived is stored here.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::TelemetryReading;

/// Rolling counters for the FX data source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Never decreases while the process lives.
    pub ok_count: u64,
    /// Never decreases while the process lives.
    pub fail_count: u64,
    /// Reset to 0 by any success.
    pub consecutive_failures: u32,
    /// Last successful refresh; the tracker's creation time until then.
    pub last_updated_at: DateTime<Utc>,
}

impl HealthSnapshot {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            ok_count: 0,
            fail_count: 0,
            consecutive_failures: 0,
            last_updated_at: started_at,
        }
    }

    /// `n` successful refreshes, the latest at `at`.
    fn successes(&mut self, n: u64, at: DateTime<Utc>) {
        if n == 0 {
            return;
        }
        self.ok_count = self.ok_count.saturating_add(n);
        self.consecutive_failures = 0;
        self.touch(at);
    }

    /// `last_updated_at` is left alone so data age keeps growing.
    fn failures(&mut self, n: u64) {
        self.fail_count = self.fail_count.saturating_add(n);
        self.consecutive_failures = self
            .consecutive_failures
            .saturating_add(u32::try_from(n).unwrap_or(u32::MAX));
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_updated_at {
            self.last_updated_at = at;
        }
    }
}

#[derive(Debug)]
struct TrackerState {
    snapshot: HealthSnapshot,
    /// Last cumulative reading seen from the feed, for delta computation.
    last_reading: Option<TelemetryReading>,
}

/// Cloneable handle to one snapshot. Clones share state.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    inner: Arc<Mutex<TrackerState>>,
}

impl HealthTracker {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerState {
                snapshot: HealthSnapshot::new(started_at),
                last_reading: None,
            })),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut TrackerState) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Copy of the current counters.
    pub fn snapshot(&self) -> HealthSnapshot {
        self.with_state(|s| s.snapshot)
    }

    /// Fold a cumulative feed reading into the snapshot.
    ///
    /// Only the growth since the previous reading is added. A reading whose
    /// counters went backwards means the feed restarted; its counts are then
    /// taken as growth since that restart.
    ///
    /// Growth in `ok_count` is a refresh: it is stamped with the reading's
    /// `last_updated_at`, or with `polled_at` when the feed sends none.
    pub fn apply_reading(
        &self,
        reading: TelemetryReading,
        polled_at: DateTime<Utc>,
    ) -> HealthSnapshot {
        self.with_state(|s| {
            let (ok, fail) = match s.last_reading {
                Some(prev)
                    if reading.ok_count >= prev.ok_count
                        && reading.fail_count >= prev.fail_count =>
                {
                    (
                        reading.ok_count - prev.ok_count,
                        reading.fail_count - prev.fail_count,
                    )
                }
                Some(_) => {
                    tracing::info!(
                        ok_count = reading.ok_count,
                        fail_count = reading.fail_count,
                        "telemetry counters went backwards; feed restarted"
                    );
                    (reading.ok_count, reading.fail_count)
                }
                None => (reading.ok_count, reading.fail_count),
            };

            let snap = &mut s.snapshot;
            snap.failures(fail);
            snap.successes(ok, reading.last_updated_at.unwrap_or(polled_at));

            if let Some(at) = reading.last_updated_at {
                snap.touch(at);
            }
            if let Some(n) = reading.consecutive_failures {
                snap.consecutive_failures = n;
            }

            s.last_reading = Some(reading);
            *snap
        })
    }
}

static GLOBAL_TRACKER: OnceLock<HealthTracker> = OnceLock::new();

/// The process-wide tracker, created on first access.
pub fn global() -> &'static HealthTracker {
    GLOBAL_TRACKER.get_or_init(|| HealthTracker::new(Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{HealthStatus, classify};
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn reading(ok: u64, fail: u64, at: Option<i64>) -> TelemetryReading {
        TelemetryReading {
            ok_count: ok,
            fail_count: fail,
            consecutive_failures: None,
            last_updated_at: at.map(t),
        }
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let tracker = HealthTracker::new(t(0));
        tracker.apply_reading(reading(0, 1, None), t(5));
        let snap = tracker.apply_reading(reading(0, 2, None), t(10));
        assert_eq!(snap.consecutive_failures, 2);
        assert_eq!(snap.last_updated_at, t(0));

        let snap = tracker.apply_reading(reading(1, 2, Some(15)), t(15));
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.ok_count, 1);
        assert_eq!(snap.fail_count, 2);
        assert_eq!(snap.last_updated_at, t(15));
    }

    #[test]
    fn stale_feed_timestamp_never_moves_back() {
        let tracker = HealthTracker::new(t(0));
        tracker.apply_reading(reading(1, 0, Some(50)), t(50));
        let snap = tracker.apply_reading(reading(2, 0, Some(20)), t(55));
        assert_eq!(snap.ok_count, 2);
        assert_eq!(snap.last_updated_at, t(50));
    }

    #[test]
    fn readings_are_folded_as_deltas() {
        let tracker = HealthTracker::new(t(0));
        tracker.apply_reading(reading(10, 1, Some(5)), t(60));
        let snap = tracker.apply_reading(reading(12, 1, Some(10)), t(60));
        assert_eq!(snap.ok_count, 12);
        assert_eq!(snap.fail_count, 1);
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.last_updated_at, t(10));
    }

    #[test]
    fn feed_restart_keeps_counters_monotonic() {
        let tracker = HealthTracker::new(t(0));
        tracker.apply_reading(reading(100, 4, Some(5)), t(60));
        let snap = tracker.apply_reading(reading(2, 1, Some(10)), t(60));
        assert_eq!(snap.ok_count, 102);
        assert_eq!(snap.fail_count, 5);
    }

    #[test]
    fn failures_without_success_accumulate() {
        let tracker = HealthTracker::new(t(0));
        tracker.apply_reading(reading(5, 0, Some(1)), t(60));
        tracker.apply_reading(reading(5, 2, None), t(60));
        let snap = tracker.apply_reading(reading(5, 3, None), t(60));
        assert_eq!(snap.consecutive_failures, 3);
        assert_eq!(snap.last_updated_at, t(1));
    }

    #[test]
    fn reported_consecutive_failures_are_trusted() {
        let tracker = HealthTracker::new(t(0));
        let mut r = reading(5, 2, None);
        r.consecutive_failures = Some(1);
        assert_eq!(tracker.apply_reading(r, t(60)).consecutive_failures, 1);
    }

    #[test]
    fn untimestamped_successes_refresh_at_poll_time() {
        let tracker = HealthTracker::new(t(0));
        let mut snap = tracker.snapshot();
        for i in 1..=140 {
            snap = tracker.apply_reading(reading(i, 0, None), t(5 * i as i64));
        }
        assert_eq!(snap.ok_count, 140);
        assert_eq!(snap.last_updated_at, t(700));
        assert_eq!(classify(&snap, t(700)).status, HealthStatus::Healthy);
    }

    #[test]
    fn untimestamped_failures_do_not_refresh() {
        let tracker = HealthTracker::new(t(0));
        tracker.apply_reading(reading(1, 0, None), t(5));
        let snap = tracker.apply_reading(reading(1, 4, None), t(10));
        assert_eq!(snap.last_updated_at, t(5));
        assert_eq!(snap.consecutive_failures, 4);
    }

    #[test]
    fn huge_counts_saturate_across_restart() {
        let tracker = HealthTracker::new(t(0));
        tracker.apply_reading(reading(u64::MAX, u64::MAX, Some(1)), t(5));
        let snap = tracker.apply_reading(reading(5, 3, Some(2)), t(10));
        assert_eq!(snap.ok_count, u64::MAX);
        assert_eq!(snap.fail_count, u64::MAX);
        assert_eq!(snap.last_updated_at, t(2));
    }

    #[test]
    fn global_tracker_is_shared() {
        let a = global();
        let b = global();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }
}

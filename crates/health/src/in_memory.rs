//! Scripted telemetry feed (dev/test wiring).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::feed::{FeedError, TelemetryFeed, TelemetryReading};

/// Replays queued readings; the last one keeps answering once the queue drains.
#[derive(Debug, Default)]
pub struct ScriptedFeed {
    script: Mutex<VecDeque<Result<TelemetryReading, FeedError>>>,
    reads: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reading: TelemetryReading) -> &Self {
        self.push_result(Ok(reading))
    }

    pub fn push_error(&self, error: FeedError) -> &Self {
        self.push_result(Err(error))
    }

    fn push_result(&self, r: Result<TelemetryReading, FeedError>) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(r);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetryFeed for ScriptedFeed {
    async fn read(&self) -> Result<TelemetryReading, FeedError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        next.unwrap_or_else(|| Err(FeedError::Network("no scripted reading".to_string())))
    }
}

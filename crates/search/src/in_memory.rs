//! In-memory backend and prompter (dev/test wiring).
//!
//! `ScriptedBackend` answers from per-endpoint scripts and records every call,
//! `ScriptedPrompter` answers permission checks from fixed tables.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{BackendError, Endpoint, SearchBackend};
use crate::permission::{Permission, PermissionPrompter, PermissionStatus, PromptDecision};

/// A call observed by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: Endpoint,
    pub body: Value,
}

#[derive(Debug, Clone)]
struct Reply {
    delay: Option<Duration>,
    outcome: Result<Value, BackendError>,
}

/// Backend that replays scripted replies.
///
/// Replies queue per endpoint; the last reply of a queue stays in place and
/// answers every further call. Endpoints without a script answer HTTP 404.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<Endpoint, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, endpoint: Endpoint, body: Value) -> &Self {
        self.push(endpoint, None, Ok(body))
    }

    pub fn reply_after(&self, endpoint: Endpoint, delay: Duration, body: Value) -> &Self {
        self.push(endpoint, Some(delay), Ok(body))
    }

    pub fn fail(&self, endpoint: Endpoint, error: BackendError) -> &Self {
        self.push(endpoint, None, Err(error))
    }

    fn push(
        &self,
        endpoint: Endpoint,
        delay: Option<Duration>,
        outcome: Result<Value, BackendError>,
    ) -> &Self {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(endpoint)
            .or_default()
            .push_back(Reply { delay, outcome });
        self
    }

    fn next_reply(&self, endpoint: Endpoint) -> Option<Reply> {
        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = scripts.get_mut(&endpoint)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    /// Every call so far, in issue order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<Value, BackendError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall { endpoint, body });

        let Some(reply) = self.next_reply(endpoint) else {
            return Err(BackendError::Status {
                status: 404,
                body: format!("no scripted reply for {endpoint}"),
            });
        };

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.outcome
    }
}

/// Prompter driven by fixed status and answer tables.
///
/// Unlisted permissions start `Undetermined` and are answered with the
/// default decision. Granted and denied answers are remembered, dismissals are not.
#[derive(Debug)]
pub struct ScriptedPrompter {
    statuses: Mutex<HashMap<Permission, PermissionStatus>>,
    answers: HashMap<Permission, PromptDecision>,
    default_answer: PromptDecision,
    prompt_delay: Option<Duration>,
    prompts: AtomicUsize,
    status_checks: AtomicUsize,
}

impl Default for ScriptedPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPrompter {
    /// Everything undetermined; prompts are denied.
    pub fn new() -> Self {
        Self::answering(PromptDecision::Denied)
    }

    pub fn grant_all() -> Self {
        Self::answering(PromptDecision::Granted)
    }

    pub fn deny_all() -> Self {
        Self::answering(PromptDecision::Denied)
    }

    fn answering(default_answer: PromptDecision) -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            answers: HashMap::new(),
            default_answer,
            prompt_delay: None,
            prompts: AtomicUsize::new(0),
            status_checks: AtomicUsize::new(0),
        }
    }

    pub fn with_status(self, permission: Permission, status: PermissionStatus) -> Self {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(permission, status);
        self
    }

    pub fn with_answer(mut self, permission: Permission, decision: PromptDecision) -> Self {
        self.answers.insert(permission, decision);
        self
    }

    /// Simulate a user who takes a while to answer.
    pub fn with_prompt_delay(mut self, delay: Duration) -> Self {
        self.prompt_delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn status_checks(&self) -> usize {
        self.status_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionPrompter for ScriptedPrompter {
    async fn status(&self, permission: Permission) -> PermissionStatus {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&permission)
            .copied()
            .unwrap_or(PermissionStatus::Undetermined)
    }

    async fn request(&self, permission: Permission) -> PromptDecision {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.prompt_delay {
            tokio::time::sleep(delay).await;
        }

        let decision = self
            .answers
            .get(&permission)
            .copied()
            .unwrap_or(self.default_answer);

        let remembered = match decision {
            PromptDecision::Granted => Some(PermissionStatus::Granted),
            PromptDecision::Denied => Some(PermissionStatus::Denied),
            PromptDecision::Dismissed => None,
        };
        if let Some(status) = remembered {
            self.statuses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(permission, status);
        }
        decision
    }
}

//! Search dispatch pipeline (one session per hosting search surface).
//!
//! ```text
//! execute(tool, input)
//!   ↓
//! 1. Start a new generation (supersedes anything in flight)
//!   ↓
//! 2. Registry lookup + input guard        → Idle on failure, no I/O
//!   ↓
//! 3. Authorizing: permission gate         → Idle on refusal, no I/O
//!   ↓
//! 4. Executing: locale + backend call + normalize
//!    (voice_input: chained quick_search on the transcript)
//!   ↓
//! 5. Apply to the view only if the generation is still current
//! ```
//!
//! The view lives in a `watch` channel. Every state write is conditional on
//! the generation that issued it, so a superseded or cancelled execution can
//! never touch what the host renders.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use tradeflow_core::SessionId;

use crate::backend::SearchBackend;
use crate::error::SearchError;
use crate::locale::LocaleResolver;
use crate::normalize;
use crate::permission::{PermissionGate, PermissionPrompter};
use crate::request::{SearchInput, SearchRequest};
use crate::result::{QuickSearchResult, SearchResult};
use crate::tool::{ToolId, ToolRegistry};

/// Lifecycle of the session's current execution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Idle,
    Authorizing,
    Executing,
    Succeeded,
    Failed,
    Cancelled,
}

impl DispatchState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, DispatchState::Authorizing | DispatchState::Executing)
    }
}

/// What the host renders for a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub state: DispatchState,
    /// Tool of the latest accepted execution.
    pub tool: Option<ToolId>,
    pub result: Option<SearchResult>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<SearchError>,
    /// Generation of the latest execute/close call.
    pub generation: u64,
}

impl SessionView {
    fn idle() -> Self {
        Self {
            state: DispatchState::Idle,
            tool: None,
            result: None,
            error: None,
            generation: 0,
        }
    }
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<SearchError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&serde_json::json!({
            "kind": e.kind(),
            "message": e.to_string(),
            "recoverable": e.is_recoverable(),
        })),
        None => serializer.serialize_none(),
    }
}

/// How one `execute` call ended, from the caller's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Result applied to the view (`Succeeded`).
    Completed(SearchResult),
    /// Error applied to the view (`Failed`).
    Failed(SearchError),
    /// Refused before leaving `Idle` (unknown tool, invalid input).
    Rejected(SearchError),
    /// The permission gate refused; the view is back to `Idle`.
    PermissionRequired(ToolId),
    /// A newer execute on this session took over; nothing was applied.
    Superseded,
    /// The session was closed while this execution was in flight.
    Cancelled,
}

/// Collaborators a session needs.
#[derive(Clone)]
pub struct DispatcherDeps {
    pub registry: ToolRegistry,
    pub locale: LocaleResolver,
    pub backend: Arc<dyn SearchBackend>,
    pub prompter: Arc<dyn PermissionPrompter>,
}

/// A single search surface: at most one execution applies its result at a time.
pub struct SearchSession {
    id: SessionId,
    registry: ToolRegistry,
    locale: LocaleResolver,
    backend: Arc<dyn SearchBackend>,
    gate: PermissionGate,
    view: watch::Sender<SessionView>,
}

impl SearchSession {
    pub fn new(deps: DispatcherDeps) -> Self {
        let gate = PermissionGate::new(deps.registry.clone(), deps.prompter);
        let (view, _) = watch::channel(SessionView::idle());
        Self {
            id: SessionId::new(),
            registry: deps.registry,
            locale: deps.locale,
            backend: deps.backend,
            gate,
            view,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Current view snapshot.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Observe view changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    /// Run `tool_id` with `input`. Never panics on dispatch errors; the outcome
    /// and the view carry them.
    pub async fn execute(&self, tool_id: &str, input: SearchInput) -> DispatchOutcome {
        let generation = self.begin();

        let tool = match self.registry.get(tool_id) {
            Ok(descriptor) => descriptor.id,
            Err(e) => {
                tracing::error!(session = %self.id, tool_id, "dispatch requested for unregistered tool");
                return self.reject(generation, None, e);
            }
        };

        if let Err(e) = input.validate_for(tool) {
            tracing::debug!(session = %self.id, %tool, error = %e, "request rejected by guard");
            return self.reject(generation, Some(tool), e);
        }

        self.apply(generation, |v| {
            v.state = DispatchState::Authorizing;
            v.tool = Some(tool);
            v.error = None;
        });

        let authorized = tokio::select! {
            biased;
            _ = self.overtaken(generation) => return self.lost(generation),
            granted = self.gate.authorize(tool) => granted,
        };

        if !authorized {
            tracing::info!(session = %self.id, %tool, "dispatch stopped: permission required");
            let applied = self.apply(generation, |v| {
                v.state = DispatchState::Idle;
                v.error = Some(SearchError::PermissionDenied { tool });
            });
            return if applied {
                DispatchOutcome::PermissionRequired(tool)
            } else {
                self.lost(generation)
            };
        }

        if !self.apply(generation, |v| v.state = DispatchState::Executing) {
            return self.lost(generation);
        }

        let request = SearchRequest::new(tool, input, self.locale.resolve());
        tracing::debug!(
            session = %self.id,
            request_id = %request.request_id,
            %tool,
            locale = %request.locale,
            generation,
            "dispatching"
        );

        let outcome = tokio::select! {
            biased;
            _ = self.overtaken(generation) => return self.lost(generation),
            outcome = self.run(&request) => outcome,
        };

        let applied = match &outcome {
            Ok(result) => self.apply(generation, |v| {
                v.state = DispatchState::Succeeded;
                v.result = Some(result.clone());
                v.error = None;
            }),
            Err(e) => self.apply(generation, |v| {
                v.state = DispatchState::Failed;
                v.result = None;
                v.error = Some(e.clone());
            }),
        };

        if !applied {
            tracing::debug!(session = %self.id, request_id = %request.request_id, "discarding late response");
            return self.lost(generation);
        }

        match outcome {
            Ok(result) => {
                tracing::info!(session = %self.id, request_id = %request.request_id, %tool, "dispatch succeeded");
                DispatchOutcome::Completed(result)
            }
            Err(e) => {
                tracing::warn!(
                    session = %self.id,
                    request_id = %request.request_id,
                    %tool,
                    kind = e.kind(),
                    error = %e,
                    "dispatch failed"
                );
                DispatchOutcome::Failed(e)
            }
        }
    }

    /// Tear down: cancel whatever is in flight. The session stays usable.
    pub fn close(&self) {
        self.view.send_modify(|v| {
            v.generation += 1;
            if v.state.is_in_flight() {
                tracing::info!(session = %self.id, tool = ?v.tool, "cancelling in-flight dispatch");
                v.state = DispatchState::Cancelled;
            }
        });
    }

    /// Backend call + normalization (+ chained search for voice).
    async fn run(&self, request: &SearchRequest) -> Result<SearchResult, SearchError> {
        let tool = request.tool;
        let raw = self
            .backend
            .post(tool.endpoint(), request.body())
            .await
            .map_err(|e| SearchError::from_backend(tool.as_str(), e))?;

        let result = normalize::normalize(tool, &raw).inspect_err(|e| {
            tracing::warn!(request_id = %request.request_id, %tool, error = %e, "could not normalize response");
        })?;

        match result {
            SearchResult::VoiceInput(mut voice) => {
                voice.chained_search = self.chained_search(request, &voice.transcript).await;
                Ok(SearchResult::VoiceInput(voice))
            }
            other => Ok(other),
        }
    }

    /// Second step of the voice pipeline. Failure here is a partial success.
    async fn chained_search(
        &self,
        voice: &SearchRequest,
        transcript: &str,
    ) -> Option<QuickSearchResult> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            tracing::info!(request_id = %voice.request_id, "empty transcript; skipping chained search");
            return None;
        }

        let chained = SearchRequest::chained_quick_search(voice, transcript);
        let outcome = self
            .backend
            .post(chained.tool.endpoint(), chained.body())
            .await
            .map_err(|e| SearchError::from_backend(ToolId::QuickSearch.as_str(), e))
            .and_then(|raw| normalize::quick_search(&raw));

        match outcome {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(
                    request_id = %voice.request_id,
                    chained_request_id = %chained.request_id,
                    error = %e,
                    "chained quick search failed; returning transcript only"
                );
                None
            }
        }
    }

    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.view.send_modify(|v| {
            v.generation += 1;
            generation = v.generation;
        });
        generation
    }

    /// Mutate the view iff `generation` is still the latest. Returns whether it applied.
    fn apply(&self, generation: u64, f: impl FnOnce(&mut SessionView)) -> bool {
        self.view.send_if_modified(|v| {
            if v.generation != generation {
                return false;
            }
            f(v);
            true
        })
    }

    fn reject(&self, generation: u64, tool: Option<ToolId>, error: SearchError) -> DispatchOutcome {
        let applied = self.apply(generation, |v| {
            v.state = DispatchState::Idle;
            if tool.is_some() {
                v.tool = tool;
            }
            v.error = Some(error.clone());
        });
        if applied {
            DispatchOutcome::Rejected(error)
        } else {
            self.lost(generation)
        }
    }

    /// Resolves once a newer generation exists.
    async fn overtaken(&self, generation: u64) {
        let mut rx = self.view.subscribe();
        loop {
            if rx.borrow_and_update().generation != generation {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped with the session; nothing can overtake any more.
                std::future::pending::<()>().await;
            }
        }
    }

    fn lost(&self, generation: u64) -> DispatchOutcome {
        let cancelled = self.view.borrow().state == DispatchState::Cancelled;
        tracing::debug!(session = %self.id, generation, cancelled, "execution overtaken");
        if cancelled {
            DispatchOutcome::Cancelled
        } else {
            DispatchOutcome::Superseded
        }
    }
}

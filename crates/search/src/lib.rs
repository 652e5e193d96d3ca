//! Search orchestration: tool catalog, permission gating, dispatch and
//! normalization of the six search/capture modalities.

pub mod backend;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod in_memory;
pub mod locale;
pub mod normalize;
pub mod permission;
pub mod request;
pub mod result;
pub mod tool;

pub use backend::{BackendError, Endpoint, SearchBackend};
pub use dispatcher::{DispatchOutcome, DispatchState, DispatcherDeps, SearchSession, SessionView};
pub use error::SearchError;
pub use http::{ApiConfig, IntentAnalysis, SearchApi, ServiceHealth, UserPreferences};
pub use locale::LocaleResolver;
pub use normalize::normalize;
pub use permission::{Permission, PermissionGate, PermissionPrompter, PermissionStatus, PromptDecision};
pub use request::{Capture, FilterValue, Filters, SearchInput, SearchRequest};
pub use result::SearchResult;
pub use tool::{PermissionSet, ToolDescriptor, ToolId, ToolRegistry};

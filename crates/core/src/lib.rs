//! `tradeflow-core`: shared building blocks for the interaction core.
//!
//! This crate contains **pure** value types (no IO, no runtime): the error model,
//! strongly-typed identifiers and the regional context every backend call carries.

pub mod error;
pub mod id;
pub mod locale;

pub use error::{CoreError, CoreResult};
pub use id::{RequestId, SessionId};
pub use locale::{Locale, currency_for_country};

//! Common types for the order dispatch tracker.
//!
//! This crate holds the data shapes shared by every tracker component: the
//! persisted dispatch record, the order summary returned by order sources,
//! storage key helpers, API payloads and the configuration validation
//! framework used by pluggable implementations.

/// API payloads and error responses for the HTTP layer.
pub mod api;
/// Dispatch records and order summaries.
pub mod dispatch;
/// Self-registration trait for pluggable implementations.
pub mod registry;
/// Redacting wrapper for credentials.
pub mod secret_string;
/// Key layout of the dispatch namespace.
pub mod storage;
/// Display helpers.
pub mod utils;
/// Configuration validation types.
pub mod validation;

pub use api::*;
pub use dispatch::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::{format_order_date, truncate_id};
pub use validation::*;

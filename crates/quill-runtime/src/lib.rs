//! Quill Runtime - Stateful realtime services
//!
//! Everything here keeps its state in the shared [`Cache`](quill_store::Cache)
//! and the [`EntityStore`](quill_core::EntityStore), never in process memory,
//! so any number of handler processes can run side by side:
//!
//! - [`ConnectionTracker`] bounds live subscriptions per user
//! - [`CounterManager`] owns view/like/comment counters
//! - [`EditingManager`] owns collaborative editing sessions and presence
//! - [`ContentHooks`] turns domain mutations into events
//! - [`RealtimeService`] is the caller-facing surface over all of the above

pub mod tracker;
pub mod counters;
pub mod editing;
pub mod hooks;
pub mod service;
pub mod telemetry;

pub use tracker::*;
pub use counters::*;
pub use editing::*;
pub use hooks::*;
pub use service::*;
pub use telemetry::*;

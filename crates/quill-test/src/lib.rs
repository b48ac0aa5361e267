//! Quill Test Harness - Fixtures and end-to-end scenarios
//!
//! This crate provides:
//! - A recording delivery transport with per-channel failure injection
//! - A fully wired service over in-memory collaborators and a manual clock
//! - Scenario runners for concurrency, fan-out, presence and rate limits

pub mod recorder;
pub mod harness;
pub mod scenarios;

pub use recorder::*;
pub use harness::*;
pub use scenarios::*;

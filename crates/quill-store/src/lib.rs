//! Quill Store - Shared state collaborators
//!
//! Request handlers share no process memory, so every piece of coordination
//! lives behind these seams:
//! - `Cache`: ephemeral keys with per-entry TTL and a few atomic primitives
//! - `MemoryCache`: single-process reference backend
//! - `MemoryStore`: single-process `EntityStore` with atomic view increments

pub mod cache;
pub mod memory;
pub mod entities;

pub use cache::*;
pub use memory::*;
pub use entities::*;

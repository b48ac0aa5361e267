//! Quill Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every Quill crate:
//! - Identifiers (UserId, ArticleId, CategoryId, SessionToken)
//! - Principals (who is asking)
//! - Entity records and the `EntityStore` lookup seam
//! - Clocks and timestamp formatting
//! - Configuration and the error taxonomy

pub mod id;
pub mod principal;
pub mod entity;
pub mod time;
pub mod config;
pub mod error;

pub use id::*;
pub use principal::*;
pub use entity::*;
pub use time::*;
pub use config::*;
pub use error::*;

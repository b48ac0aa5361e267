//! Error types for Quill

use thiserror::Error;

use crate::{ArticleId, UserId};

/// Core Quill errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuillError {
    // Access errors
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied for channel {channel}")]
    PermissionDenied { channel: String },

    #[error("Edit permission required")]
    EditPermissionRequired,

    #[error("Rate limit exceeded: user {user} holds {limit} connections")]
    RateLimited { user: UserId, limit: usize },

    // Lookup errors
    #[error("Article not found: {0}")]
    ArticleNotFound(ArticleId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    // Delivery errors
    #[error("Delivery to {channel} failed: {reason}")]
    DeliveryFailure { channel: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Collaborator errors
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl QuillError {
    /// Response code surfaced by the caller-facing API
    pub fn status_code(&self) -> u16 {
        match self {
            QuillError::Unauthenticated => 401,
            QuillError::PermissionDenied { .. } | QuillError::EditPermissionRequired => 403,
            QuillError::ArticleNotFound(_) | QuillError::UserNotFound(_) => 404,
            QuillError::RateLimited { .. } => 429,
            QuillError::InvalidChannel(_) => 400,
            _ => 500,
        }
    }

    /// Whether a caller may retry the same request unchanged.
    ///
    /// Client errors and delivery failures are never retried; only
    /// collaborator outages are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QuillError::Cache(_) | QuillError::Store(_))
    }
}

/// Result type for Quill operations
pub type QuillResult<T> = Result<T, QuillError>;

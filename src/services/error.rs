//! Service error taxonomy
//!
//! One error enum shared by all services. The API layer maps each variant to
//! an HTTP status code; services never retry internally, and multi-step
//! cleanup operations are written so that a failed call can simply be issued
//! again.

use thiserror::Error;

/// Errors surfaced by the service layer
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input (out-of-range rating, bad email, empty title, ...)
    #[error("{0}")]
    Validation(String),

    /// An author tried to rate their own post
    #[error("Cannot rate your own post")]
    SelfRating,

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// The caller lacks the privilege for this operation
    #[error("{0}")]
    Forbidden(String),

    /// A referenced post/user/category does not exist
    #[error("{0}")]
    NotFound(String),

    /// The operation conflicts with existing state (duplicate email or
    /// category name, already-saved post, category still in use)
    #[error("{0}")]
    Conflict(String),

    /// A collaborator (storage, outbound mail) is unavailable
    #[error("{0}")]
    Dependency(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for service results
pub type ServiceResult<T> = Result<T, ServiceError>;

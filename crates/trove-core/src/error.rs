//! Error taxonomy for catalog operations
//!
//! Every failure in the catalog core is one of these discriminants. Layers
//! above (store, service, API) convert into their own error types but keep
//! the discrimination intact so the HTTP surface can map each class to a
//! distinct status code.

use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Main error type for catalog operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Malformed path, name, file, or descriptor type. Always rejected
    /// before any mutation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Duplicate registration, duplicate alias, or deletion of a frozen or
    /// default-only version. Rejected with no partial effect.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A privileged action attempted by a subject without the required
    /// ownership or admin rights.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Entry, version, or alias absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing registry token or a source-control/registry API failure.
    /// The affected refresh aborts; prior state is untouched.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A version cannot be frozen because one of its image references is
    /// late-bound or floating.
    #[error("Version {version} cannot be snapshotted: {reason}")]
    SnapshotIneligible { version: String, reason: String },

    /// Invariant breakage that callers cannot act on.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        CatalogError::Validation(msg.into())
    }

    /// Shorthand for a conflict.
    pub fn conflict(msg: impl Into<String>) -> Self {
        CatalogError::Conflict(msg.into())
    }

    /// Shorthand for a missing entity.
    pub fn not_found(msg: impl Into<String>) -> Self {
        CatalogError::NotFound(msg.into())
    }
}

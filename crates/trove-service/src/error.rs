//! Service-layer error types
//!
//! Maps domain and store errors onto the service surface while keeping the
//! taxonomy intact for the HTTP layer.

use thiserror::Error;
use trove_core::CatalogError;
use trove_store::StoreError;

/// Result type alias for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Service-layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Missing registry token or collaborator API failure; the affected
    /// operation aborted with prior state untouched
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Version {version} cannot be snapshotted: {reason}")]
    SnapshotIneligible { version: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(msg) => ServiceError::Validation(msg),
            CatalogError::Conflict(msg) => ServiceError::Conflict(msg),
            CatalogError::Authorization(msg) => ServiceError::Authorization(msg),
            CatalogError::NotFound(msg) => ServiceError::NotFound(msg),
            CatalogError::UpstreamUnavailable(msg) => ServiceError::Upstream(msg),
            CatalogError::SnapshotIneligible { version, reason } => {
                ServiceError::SnapshotIneligible { version, reason }
            }
            CatalogError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Domain(err) => ServiceError::from(err),
            StoreError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err: ServiceError = StoreError::Conflict("dup".to_string()).into();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn test_snapshot_ineligible_names_the_version() {
        let err: ServiceError = CatalogError::SnapshotIneligible {
            version: "2".to_string(),
            reason: "floating tag".to_string(),
        }
        .into();
        assert!(err.to_string().contains('2'));
    }
}

//! Store-layer error types

use thiserror::Error;
use trove_core::CatalogError;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store-layer error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// Entry, version, or alias absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation: duplicate path, version name, or alias
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A domain invariant rejected the write
    #[error(transparent)]
    Domain(#[from] CatalogError),

    /// Storage malfunction
    #[error("Store error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_passes_through() {
        let err: StoreError = CatalogError::conflict("dup alias").into();
        assert_eq!(err.to_string(), "Conflict: dup alias");
    }
}

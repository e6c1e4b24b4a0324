//! Content checksums
//!
//! Checksums are computed at write time, for every source file when a
//! version is created or refreshed and for every image manifest digest.
//! They are never recomputed lazily: file content may later be nulled out
//! for storage reclamation while the checksum must remain retrievable.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CatalogError, Result};

/// Checksum algorithm identifier, using the registered TRS token form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumType {
    #[serde(rename = "sha-256")]
    Sha256,
}

impl ChecksumType {
    /// Expected hex length for this algorithm
    pub fn hex_length(&self) -> usize {
        match self {
            ChecksumType::Sha256 => 64,
        }
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumType::Sha256 => write!(f, "sha-256"),
        }
    }
}

impl FromStr for ChecksumType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha-256" | "sha256" => Ok(ChecksumType::Sha256),
            _ => Err(CatalogError::validation(format!(
                "Invalid checksum type: {s}"
            ))),
        }
    }
}

/// A checksum value paired with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    /// Algorithm token (`sha-256`)
    #[serde(rename = "type")]
    pub algo: ChecksumType,
    /// Hex digest, lowercase
    pub value: String,
}

impl Checksum {
    /// Create a checksum, validating the digest format for the algorithm.
    pub fn new(algo: ChecksumType, value: impl Into<String>) -> Result<Self> {
        let value = value.into().to_lowercase();
        if value.len() != algo.hex_length() {
            return Err(CatalogError::validation(format!(
                "Invalid {algo} digest length: expected {} hex characters, got {}",
                algo.hex_length(),
                value.len()
            )));
        }
        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CatalogError::validation(
                "Invalid digest: must be a hexadecimal string".to_string(),
            ));
        }
        Ok(Self { algo, value })
    }

    /// Build a `sha-256` checksum from a digest that may carry the
    /// `sha256:` registry prefix.
    pub fn from_digest(digest: &str) -> Result<Self> {
        let hex = digest.strip_prefix("sha256:").unwrap_or(digest);
        Checksum::new(ChecksumType::Sha256, hex)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algo, self.value)
    }
}

/// Compute the SHA-256 checksum of a byte slice.
///
/// Pure function with no shared state; callers may parallelize per file or
/// image.
pub fn sha256(data: &[u8]) -> Checksum {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Checksum {
        algo: ChecksumType::Sha256,
        value: format!("{:x}", hasher.finalize()),
    }
}

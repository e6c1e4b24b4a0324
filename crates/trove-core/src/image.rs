//! Container image references and resolved image records
//!
//! An image reference is the string form found in a descriptor or tool
//! configuration (`quay.io/org/tool:1.0`, `org/tool@sha256:…`). Resolution
//! against a registry turns one reference into zero or more concrete,
//! architecture-specific [`Image`] records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::checksum::Checksum;
use crate::error::{CatalogError, Result};

/// A parsed container image reference.
///
/// Supported grammars: `name`, `name:tag`, `name@sha256:digest`,
/// `name:tag@sha256:digest`. A bare `name` implies the floating `latest`
/// tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// Repository, including any registry host prefix (`quay.io/org/tool`)
    pub repository: String,
    /// Explicit tag, if present
    pub tag: Option<String>,
    /// `sha256:`-prefixed digest, if present
    pub digest: Option<String>,
    /// True when the reference contains descriptor-parameter interpolation
    /// and is only bound at launch time
    pub parameterized: bool,
}

impl ImageReference {
    /// Effective tag: the explicit tag, or `latest` when neither tag nor
    /// digest is present.
    pub fn effective_tag(&self) -> Option<&str> {
        match (&self.tag, &self.digest) {
            (Some(t), _) => Some(t),
            (None, None) => Some("latest"),
            (None, Some(_)) => None,
        }
    }

    /// A reference is pinned when a digest addresses it directly.
    pub fn is_pinned(&self) -> bool {
        self.digest.is_some()
    }

    /// Whether this reference may drift between syncs: late-bound
    /// parameters and the floating `latest` tag (explicit or implied)
    /// without a digest both disqualify a version from snapshotting.
    pub fn is_floating(&self) -> bool {
        if self.parameterized {
            return true;
        }
        !self.is_pinned() && self.effective_tag() == Some("latest")
    }
}

impl FromStr for ImageReference {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(CatalogError::validation("Empty image reference"));
        }
        let parameterized = s.contains("$(") || s.contains("${");

        let (name_part, digest) = match s.split_once('@') {
            Some((name, digest)) => {
                if !digest.starts_with("sha256:") {
                    return Err(CatalogError::validation(format!(
                        "Invalid image digest '{digest}': expected sha256:<hex>"
                    )));
                }
                (name, Some(digest.to_string()))
            }
            None => (s, None),
        };

        // A ':' only introduces a tag when it follows the last '/'; before
        // that it is a registry host port.
        let (repository, tag) = match name_part.rfind(':') {
            Some(idx) if idx > name_part.rfind('/').unwrap_or(0) => (
                name_part[..idx].to_string(),
                Some(name_part[idx + 1..].to_string()),
            ),
            _ => (name_part.to_string(), None),
        };

        if repository.is_empty() {
            return Err(CatalogError::validation(format!(
                "Invalid image reference '{s}': missing repository"
            )));
        }
        if let Some(ref t) = tag {
            if t.is_empty() {
                return Err(CatalogError::validation(format!(
                    "Invalid image reference '{s}': empty tag"
                )));
            }
        }

        Ok(Self {
            repository,
            tag,
            digest,
            parameterized,
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(ref t) = self.tag {
            write!(f, ":{t}")?;
        }
        if let Some(ref d) = self.digest {
            write!(f, "@{d}")?;
        }
        Ok(())
    }
}

/// A resolved, architecture-specific image record attached to a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Registry host (`quay.io`, `ghcr.io`, …)
    pub registry: String,
    /// Repository within the registry (`org/tool`)
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Digest-derived checksums, computed at resolution time
    pub checksums: Vec<Checksum>,
}

impl Image {
    /// Identity used for per-version deduplication.
    pub fn dedup_key(&self) -> (String, String, Option<String>, Option<String>) {
        (
            self.registry.clone(),
            self.repository.clone(),
            self.digest.clone(),
            self.architecture.clone(),
        )
    }
}

/// Merge images that are identical in (registry, repository, digest,
/// architecture), keeping first-seen order.
pub fn dedup_images(images: Vec<Image>) -> Vec<Image> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(images.len());
    for image in images {
        if seen.insert(image.dedup_key()) {
            out.push(image);
        }
    }
    out
}

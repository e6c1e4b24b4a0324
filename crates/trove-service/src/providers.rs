//! Capability traits for external collaborators
//!
//! The catalog never talks to GitHub, Quay, or a CWL parser directly; it
//! depends on these read-only capability traits. Production adapters live
//! outside this repository; the test suites supply scripted
//! implementations.

use async_trait::async_trait;
use trove_core::{Entry, ReferenceType, SourceFile};

use crate::error::ServiceResult;

/// One ref (branch or tag) as reported by a source-control provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub name: String,
    pub reference_type: ReferenceType,
    pub commit_id: String,
}

impl RepoRef {
    pub fn tag(name: impl Into<String>, commit_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference_type: ReferenceType::Tag,
            commit_id: commit_id.into(),
        }
    }

    pub fn branch(name: impl Into<String>, commit_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference_type: ReferenceType::Branch,
            commit_id: commit_id.into(),
        }
    }
}

/// Read-only view of a source-control provider (GitHub, Bitbucket, GitLab).
#[async_trait]
pub trait SourceCodeProvider: Send + Sync {
    /// List refs for `organization/repository`.
    ///
    /// Transient provider failures (rate limiting, outages) surface as
    /// `Upstream` errors and abort the caller's refresh.
    async fn list_refs(&self, organization: &str, repository: &str) -> ServiceResult<Vec<RepoRef>>;
}

/// Result of parsing a descriptor tree at one ref.
///
/// Descriptor-language semantics are opaque to the catalog: the parser
/// yields a file list, a validity flag, optional metadata, and the image
/// references it saw.
#[derive(Debug, Clone, Default)]
pub struct ParsedDescriptor {
    /// Full file set for the version, primary descriptor included
    pub files: Vec<SourceFile>,
    pub valid: bool,
    pub author: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    /// Raw image reference strings found in the descriptor
    pub image_references: Vec<String>,
}

/// Opaque descriptor-parsing capability.
#[async_trait]
pub trait DescriptorParser: Send + Sync {
    /// Parse the descriptor tree of `entry` at `reference`, rooted at
    /// `primary_path`.
    async fn parse(
        &self,
        entry: &Entry,
        reference: &RepoRef,
        primary_path: &str,
    ) -> ServiceResult<ParsedDescriptor>;
}

/// One manifest as reported by an image registry. Multi-architecture
/// manifest lists yield one `ManifestInfo` per architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    /// `sha256:`-prefixed manifest digest
    pub digest: String,
    pub architecture: Option<String>,
    pub size: Option<u64>,
}

/// Read-only view of one image registry (Quay, Docker Hub, GHCR, ECR).
///
/// One implementation per registry; the resolver depends only on this
/// interface.
#[async_trait]
pub trait ImageRegistryClient: Send + Sync {
    /// Registry host this client serves (`quay.io`, `docker.io`, …).
    fn registry_host(&self) -> &str;

    /// True when the registry requires a credential that has not been
    /// linked. Refreshes that need this registry abort up front.
    fn token_missing(&self) -> bool;

    /// Manifests addressed by a digest. A manifest-list digest returns one
    /// entry per architecture.
    async fn list_manifests_by_digest(
        &self,
        repository: &str,
        digest: &str,
    ) -> ServiceResult<Vec<ManifestInfo>>;

    /// The registry's current tag -> manifest(s) mapping.
    async fn list_manifests_by_tag(
        &self,
        repository: &str,
        tag: &str,
    ) -> ServiceResult<Vec<ManifestInfo>>;
}

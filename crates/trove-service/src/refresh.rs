//! Entry refresh: synchronization against source control and registries
//!
//! A refresh rebuilds an entry's version set from its provider's refs.
//! The rebuilt set commits in a single store update under the per-entry
//! lock, so a failed refresh leaves prior state untouched and a concurrent
//! hosted edit can never observe a partial set.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use trove_core::{
    Entry, EntryClass, EntryId, EntryKind, EntryMode, ImageReference, Version,
};
use trove_store::{EntryQuery, EntryRepository};

use crate::dto::RefreshReport;
use crate::error::{ServiceError, ServiceResult};
use crate::providers::{DescriptorParser, RepoRef, SourceCodeProvider};
use crate::resolver::ImageResolver;

/// How many entries a bulk refresh synchronizes at once.
const DEFAULT_FANOUT: usize = 4;

/// Trait for refresh operations
#[async_trait]
pub trait RefreshService: Send + Sync {
    /// Synchronize one entry's version set. Transitions stubs to full
    /// entries; re-syncs full entries; rejects hosted entries.
    async fn refresh(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry>;

    /// Drop all versions and return to stub mode. Only possible for
    /// unpublished, non-hosted, non-checker entries.
    async fn restub(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry>;

    /// Refresh every matching entry under one organization. Per-entry
    /// failures are collected into the report, never thrown.
    async fn refresh_organization(
        &self,
        subject: &str,
        class: EntryClass,
        source_control: &str,
        organization: &str,
    ) -> ServiceResult<RefreshReport>;
}

/// Default implementation of RefreshService
pub struct DefaultRefreshService {
    store: Arc<dyn EntryRepository>,
    /// Source-control providers keyed by host
    providers: HashMap<String, Arc<dyn SourceCodeProvider>>,
    parser: Arc<dyn DescriptorParser>,
    resolver: Arc<ImageResolver>,
    fanout: usize,
}

impl DefaultRefreshService {
    pub fn new(
        store: Arc<dyn EntryRepository>,
        providers: Vec<(String, Arc<dyn SourceCodeProvider>)>,
        parser: Arc<dyn DescriptorParser>,
        resolver: Arc<ImageResolver>,
    ) -> Self {
        Self {
            store,
            providers: providers.into_iter().collect(),
            parser,
            resolver,
            fanout: DEFAULT_FANOUT,
        }
    }

    fn provider_for(&self, host: &str) -> ServiceResult<&Arc<dyn SourceCodeProvider>> {
        self.providers.get(host).ok_or_else(|| {
            ServiceError::Upstream(format!("No source-control provider configured for {host}"))
        })
    }

    fn require_owner(entry: &Entry, subject: &str) -> ServiceResult<()> {
        if entry.is_owner(subject) {
            Ok(())
        } else {
            Err(ServiceError::Authorization(format!(
                "{subject} does not own {}",
                entry.full_path()
            )))
        }
    }

    /// Whether the prior version can be carried over without re-parsing:
    /// same commit and same configured descriptor path.
    fn unchanged(prior: &Version, repo_ref: &RepoRef, descriptor_path: &str) -> bool {
        prior.commit_id.as_deref() == Some(repo_ref.commit_id.as_str())
            && prior.descriptor_path == descriptor_path
    }

    /// Build one version from a ref, re-parsing when needed.
    async fn build_version(
        &self,
        entry: &Entry,
        repo_ref: &RepoRef,
        metadata: &mut EntryMetadata,
    ) -> ServiceResult<Version> {
        if let Some(prior) = entry.find_version(&repo_ref.name) {
            // snapshots never re-sync, even when their ref moved upstream
            if prior.frozen {
                debug!(version = %repo_ref.name, "frozen, carrying snapshot unchanged");
                return Ok(prior.clone());
            }
            if Self::unchanged(prior, repo_ref, &entry.default_descriptor_path) {
                debug!(version = %repo_ref.name, "unchanged, skipping re-parse");
                let mut carried = prior.clone();
                carried.dirty_bit = false;
                return Ok(carried);
            }
        }

        let parsed = self
            .parser
            .parse(entry, repo_ref, &entry.default_descriptor_path)
            .await?;
        metadata.offer(entry, &repo_ref.name, &parsed);

        let mut version = Version::new(
            repo_ref.name.clone(),
            repo_ref.reference_type,
            entry.default_descriptor_path.clone(),
        );
        version.commit_id = Some(repo_ref.commit_id.clone());
        version.valid = parsed.valid;
        version.source_files = parsed.files;

        let mut raw_references = parsed.image_references;
        if let EntryKind::Tool {
            registry,
            namespace,
            name,
            ..
        } = &entry.kind
        {
            raw_references.push(format!("{registry}/{namespace}/{name}:{}", repo_ref.name));
        }
        for raw in &raw_references {
            match raw.parse::<ImageReference>() {
                Ok(reference) => version.image_references.push(reference),
                Err(err) => warn!(reference = raw, %err, "ignoring unparseable image reference"),
            }
        }

        // Only tools resolve images; workflow image references are kept
        // for snapshot-eligibility checks but not resolved at sync time.
        if entry.class() == EntryClass::Tool {
            let mut images = Vec::new();
            for raw in &raw_references {
                images.extend(self.resolver.resolve(raw).await?);
            }
            version.images = trove_core::dedup_images(images);
        }

        if let Some(prior) = entry.find_version(&repo_ref.name) {
            version.preserve_user_fields(prior);
        }

        Ok(version)
    }

    /// The refresh algorithm proper; the caller holds the entry lock.
    async fn refresh_locked(&self, mut entry: Entry) -> ServiceResult<Entry> {
        // Token precondition: abort before any mutation when the tool's
        // registry needs a credential that is not linked.
        if let EntryKind::Tool { registry, .. } = &entry.kind {
            if self.resolver.token_missing(registry) {
                return Err(ServiceError::Upstream(format!(
                    "Registry {registry} has no linked token"
                )));
            }
        }

        let (host, organization, repository) = {
            let (h, o, r) = entry.kind.source_coordinates();
            (h.to_string(), o.to_string(), r.to_string())
        };
        let provider = self.provider_for(&host)?;
        let refs = provider.list_refs(&organization, &repository).await?;

        let mut metadata = EntryMetadata::default();
        let mut versions = Vec::with_capacity(refs.len());
        for repo_ref in &refs {
            versions.push(self.build_version(&entry, repo_ref, &mut metadata).await?);
        }

        // snapshots survive upstream ref deletion
        for prior in &entry.versions {
            if prior.frozen && !versions.iter().any(|v| v.name == prior.name) {
                versions.push(prior.clone());
            }
        }

        entry.versions = versions;
        entry.mode = EntryMode::Full;
        if let Some(default) = entry.default_version.clone() {
            if entry.find_version(&default).is_none() {
                entry.default_version = trove_core::version::highest_version_name(&entry.versions);
            }
        }
        metadata.apply(&mut entry);

        Ok(self.store.update(entry).await?)
    }

    /// Refresh an entry and, when one is attached, cascade onto its
    /// checker workflow.
    async fn refresh_with_cascade(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry> {
        let entry = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entry {id} not found")))?;
        Self::require_owner(&entry, subject)?;
        if entry.is_hosted() {
            return Err(ServiceError::Validation(format!(
                "Hosted entry {} cannot be refreshed",
                entry.full_path()
            )));
        }

        let _guard = self.store.lock_entry(id).await?;
        // re-read under the lock so we never refresh a stale snapshot
        let entry = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entry {id} not found")))?;
        let refreshed = self.refresh_locked(entry).await?;

        if let Some(checker_id) = refreshed.checker_id {
            let _checker_guard = self.store.lock_entry(&checker_id).await?;
            if let Some(mut checker) = self.store.find_by_id(&checker_id).await? {
                // keep the checker's test path in sync with its base
                checker.default_test_path = refreshed.default_test_path.clone();
                let checker = self.store.update(checker).await?;
                info!(checker = %checker.full_path(), "cascading refresh onto checker");
                self.refresh_locked(checker).await?;
            }
        }

        Ok(refreshed)
    }
}

/// Descriptor-derived metadata gathered while versions are rebuilt; the
/// default version's metadata wins, otherwise the first valid parse.
#[derive(Default)]
struct EntryMetadata {
    from_default: Option<(Option<String>, Option<String>, Option<String>)>,
    from_any_valid: Option<(Option<String>, Option<String>, Option<String>)>,
}

impl EntryMetadata {
    fn offer(&mut self, entry: &Entry, version_name: &str, parsed: &crate::providers::ParsedDescriptor) {
        let triple = (
            parsed.author.clone(),
            parsed.description.clone(),
            parsed.license.clone(),
        );
        if entry.default_version.as_deref() == Some(version_name) {
            self.from_default = Some(triple);
        } else if parsed.valid && self.from_any_valid.is_none() {
            self.from_any_valid = Some(triple);
        }
    }

    fn apply(self, entry: &mut Entry) {
        if let Some((author, description, license)) = self.from_default.or(self.from_any_valid) {
            entry.author = author;
            entry.description = description;
            entry.license = license;
        }
    }
}

#[async_trait]
impl RefreshService for DefaultRefreshService {
    #[instrument(skip(self))]
    async fn refresh(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry> {
        self.refresh_with_cascade(subject, id).await
    }

    #[instrument(skip(self))]
    async fn restub(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry> {
        let entry = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entry {id} not found")))?;
        Self::require_owner(&entry, subject)?;
        if entry.is_hosted() {
            return Err(ServiceError::Validation(format!(
                "Hosted entry {} cannot be restubbed",
                entry.full_path()
            )));
        }
        if entry.is_checker() {
            return Err(ServiceError::Validation(
                "Checker workflows cannot be restubbed directly".to_string(),
            ));
        }
        if entry.published {
            return Err(ServiceError::Validation(format!(
                "Published entry {} cannot be restubbed",
                entry.full_path()
            )));
        }

        let _guard = self.store.lock_entry(id).await?;
        let mut entry = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entry {id} not found")))?;
        if entry.versions.iter().any(|v| v.frozen) {
            return Err(ServiceError::Conflict(format!(
                "{} has snapshotted versions and cannot be restubbed",
                entry.full_path()
            )));
        }
        entry.versions.clear();
        entry.default_version = None;
        entry.mode = EntryMode::Stub;
        Ok(self.store.update(entry).await?)
    }

    #[instrument(skip(self))]
    async fn refresh_organization(
        &self,
        subject: &str,
        class: EntryClass,
        source_control: &str,
        organization: &str,
    ) -> ServiceResult<RefreshReport> {
        let query = EntryQuery::default()
            .class(class)
            .organization(organization);
        let entries = self.store.list(&query).await?;
        let targets: Vec<Entry> = entries
            .into_iter()
            .filter(|e| e.kind.source_coordinates().0 == source_control && !e.is_hosted())
            .collect();

        let results = stream::iter(targets)
            .map(|entry| async move {
                let path = entry.full_path();
                match self.refresh_with_cascade(subject, &entry.id).await {
                    Ok(_) => (path, None),
                    Err(err) => (path, Some(err.to_string())),
                }
            })
            .buffer_unordered(self.fanout)
            .collect::<Vec<_>>()
            .await;

        let mut report = RefreshReport::default();
        for (path, failure) in results {
            match failure {
                None => report.refreshed.push(path),
                Some(message) => report.failures.push((path, message)),
            }
        }
        report.refreshed.sort();
        report.failures.sort();
        Ok(report)
    }
}

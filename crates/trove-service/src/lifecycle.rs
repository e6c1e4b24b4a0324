//! Entry lifecycle: publication, snapshots, defaults, and aliases
//!
//! Publication gates what the TRS surface exposes. Freezing snapshots a
//! version permanently once its image references are pinned. Default-path
//! changes mark out-of-date versions dirty so the next refresh re-parses
//! them.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};
use trove_core::{Entry, EntryId};
use trove_store::EntryRepository;

use crate::error::{ServiceError, ServiceResult};
use crate::resolver::ensure_freezable;

/// Trait for lifecycle operations
#[async_trait]
pub trait LifecycleService: Send + Sync {
    /// Publish an entry, cascading to its checker. Requires at least one
    /// valid version.
    async fn publish(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry>;

    /// Unpublish an entry, cascading to its checker.
    async fn unpublish(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry>;

    /// Freeze a version into an immutable snapshot. Idempotent on an
    /// already-frozen version.
    async fn freeze_version(&self, subject: &str, id: &EntryId, version: &str)
        -> ServiceResult<Entry>;

    async fn set_default_version(
        &self,
        subject: &str,
        id: &EntryId,
        version: &str,
    ) -> ServiceResult<Entry>;

    /// Change the configured primary descriptor path. Versions recorded
    /// against a different path get their dirty bit set.
    async fn set_default_descriptor_path(
        &self,
        subject: &str,
        id: &EntryId,
        path: &str,
    ) -> ServiceResult<Entry>;

    async fn set_default_test_path(
        &self,
        subject: &str,
        id: &EntryId,
        path: Option<String>,
    ) -> ServiceResult<Entry>;

    async fn add_entry_alias(&self, subject: &str, id: &EntryId, alias: &str) -> ServiceResult<()>;

    async fn add_version_alias(
        &self,
        subject: &str,
        id: &EntryId,
        version: &str,
        alias: &str,
    ) -> ServiceResult<()>;
}

/// Default implementation of LifecycleService
pub struct DefaultLifecycleService {
    store: Arc<dyn EntryRepository>,
}

impl DefaultLifecycleService {
    pub fn new(store: Arc<dyn EntryRepository>) -> Self {
        Self { store }
    }

    async fn load_owned(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry> {
        let entry = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entry {id} not found")))?;
        if !entry.is_owner(subject) {
            return Err(ServiceError::Authorization(format!(
                "{subject} does not own {}",
                entry.full_path()
            )));
        }
        Ok(entry)
    }

    /// Set the published flag on an entry and cascade onto its checker.
    async fn set_published(
        &self,
        subject: &str,
        id: &EntryId,
        published: bool,
    ) -> ServiceResult<Entry> {
        let entry = self.load_owned(subject, id).await?;
        if entry.is_checker() {
            return Err(ServiceError::Validation(
                "Checker workflows follow their base entry's publication".to_string(),
            ));
        }
        if published && !entry.versions.iter().any(|v| v.valid) {
            return Err(ServiceError::Validation(format!(
                "{} has no valid version to publish",
                entry.full_path()
            )));
        }

        let _guard = self.store.lock_entry(id).await?;
        let mut entry = self.load_owned(subject, id).await?;
        entry.published = published;
        let entry = self.store.update(entry).await?;

        if let Some(checker_id) = entry.checker_id {
            let _checker_guard = self.store.lock_entry(&checker_id).await?;
            if let Some(mut checker) = self.store.find_by_id(&checker_id).await? {
                checker.published = published;
                self.store.update(checker).await?;
            }
        }

        info!(path = %entry.full_path(), published, "publication changed");
        Ok(entry)
    }
}

#[async_trait]
impl LifecycleService for DefaultLifecycleService {
    #[instrument(skip(self))]
    async fn publish(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry> {
        self.set_published(subject, id, true).await
    }

    #[instrument(skip(self))]
    async fn unpublish(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry> {
        self.set_published(subject, id, false).await
    }

    #[instrument(skip(self))]
    async fn freeze_version(
        &self,
        subject: &str,
        id: &EntryId,
        version: &str,
    ) -> ServiceResult<Entry> {
        self.load_owned(subject, id).await?;

        let _guard = self.store.lock_entry(id).await?;
        let mut entry = self.load_owned(subject, id).await?;
        let record = entry.find_version(version).ok_or_else(|| {
            ServiceError::NotFound(format!("Version {version} not found on {}", entry.full_path()))
        })?;
        if record.frozen {
            return Ok(entry);
        }
        ensure_freezable(record)?;
        if let Some(record) = entry.find_version_mut(version) {
            record.frozen = true;
        }
        info!(version, "froze version");
        Ok(self.store.update(entry).await?)
    }

    #[instrument(skip(self))]
    async fn set_default_version(
        &self,
        subject: &str,
        id: &EntryId,
        version: &str,
    ) -> ServiceResult<Entry> {
        self.load_owned(subject, id).await?;
        let _guard = self.store.lock_entry(id).await?;
        let mut entry = self.load_owned(subject, id).await?;
        entry.set_default_version(version)?;
        Ok(self.store.update(entry).await?)
    }

    #[instrument(skip(self))]
    async fn set_default_descriptor_path(
        &self,
        subject: &str,
        id: &EntryId,
        path: &str,
    ) -> ServiceResult<Entry> {
        let entry = self.load_owned(subject, id).await?;
        if entry.is_hosted() {
            return Err(ServiceError::Validation(
                "Hosted entries derive their descriptor path from their type".to_string(),
            ));
        }

        let _guard = self.store.lock_entry(id).await?;
        let mut entry = self.load_owned(subject, id).await?;
        entry.default_descriptor_path = path.to_string();
        for version in &mut entry.versions {
            if version.descriptor_path != path {
                version.dirty_bit = true;
            }
        }
        Ok(self.store.update(entry).await?)
    }

    #[instrument(skip(self))]
    async fn set_default_test_path(
        &self,
        subject: &str,
        id: &EntryId,
        path: Option<String>,
    ) -> ServiceResult<Entry> {
        let entry = self.load_owned(subject, id).await?;
        if entry.is_hosted() {
            return Err(ServiceError::Validation(
                "Hosted entries take test files through version edits".to_string(),
            ));
        }

        let _guard = self.store.lock_entry(id).await?;
        let mut entry = self.load_owned(subject, id).await?;
        entry.default_test_path = path;
        Ok(self.store.update(entry).await?)
    }

    #[instrument(skip(self))]
    async fn add_entry_alias(&self, subject: &str, id: &EntryId, alias: &str) -> ServiceResult<()> {
        self.load_owned(subject, id).await?;
        Ok(self.store.add_entry_alias(id, alias).await?)
    }

    #[instrument(skip(self))]
    async fn add_version_alias(
        &self,
        subject: &str,
        id: &EntryId,
        version: &str,
        alias: &str,
    ) -> ServiceResult<()> {
        let entry = self.load_owned(subject, id).await?;
        if entry.find_version(version).is_none() {
            return Err(ServiceError::NotFound(format!(
                "Version {version} not found on {}",
                entry.full_path()
            )));
        }
        Ok(self.store.add_version_alias(id, version, alias).await?)
    }
}

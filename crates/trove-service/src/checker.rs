//! Checker workflow linking
//!
//! A checker is a companion workflow that validates its base entry. It
//! lives in the base's repository, shares its owners and test path, and
//! follows the base through refresh and publish rather than being driven
//! directly.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};
use trove_core::{DescriptorType, Entry, EntryId, EntryKind};
use trove_store::EntryRepository;

use crate::error::{ServiceError, ServiceResult};

/// Trait for checker workflow operations
#[async_trait]
pub trait CheckerWorkflowLinker: Send + Sync {
    /// Create a checker workflow for the base entry and link the two.
    async fn attach(
        &self,
        subject: &str,
        base_id: &EntryId,
        descriptor_path: &str,
        descriptor_type: DescriptorType,
    ) -> ServiceResult<Entry>;
}

/// Default implementation of CheckerWorkflowLinker
pub struct DefaultCheckerWorkflowLinker {
    store: Arc<dyn EntryRepository>,
}

impl DefaultCheckerWorkflowLinker {
    pub fn new(store: Arc<dyn EntryRepository>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CheckerWorkflowLinker for DefaultCheckerWorkflowLinker {
    #[instrument(skip(self))]
    async fn attach(
        &self,
        subject: &str,
        base_id: &EntryId,
        descriptor_path: &str,
        descriptor_type: DescriptorType,
    ) -> ServiceResult<Entry> {
        let base = self
            .store
            .find_by_id(base_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entry {base_id} not found")))?;
        if !base.is_owner(subject) {
            return Err(ServiceError::Authorization(format!(
                "{subject} does not own {}",
                base.full_path()
            )));
        }
        if base.is_checker() {
            return Err(ServiceError::Validation(
                "A checker workflow cannot itself have a checker".to_string(),
            ));
        }

        let _guard = self.store.lock_entry(base_id).await?;
        let mut base = self
            .store
            .find_by_id(base_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entry {base_id} not found")))?;
        if base.versions.is_empty() {
            return Err(ServiceError::Conflict(format!(
                "{} has no versions; refresh it before attaching a checker",
                base.full_path()
            )));
        }
        if base.checker_id.is_some() {
            return Err(ServiceError::Conflict(format!(
                "{} already has a checker workflow",
                base.full_path()
            )));
        }

        // The checker lives in the base's repository under a derived name.
        let (source_control, organization, repository) = {
            let (s, o, r) = base.kind.source_coordinates();
            (s.to_string(), o.to_string(), r.to_string())
        };
        let checker_name = format!("{}_checker", base.kind.base_name());

        let mut checker = Entry::new(
            EntryKind::Workflow {
                source_control,
                organization,
                repository,
                checker_of: Some(base.id),
            },
            Some(checker_name),
            descriptor_type,
            descriptor_path,
            subject,
        )?;
        checker.owners = base.owners.clone();
        checker.default_test_path = base.default_test_path.clone();
        let checker = self.store.create(checker).await?;

        base.checker_id = Some(checker.id);
        self.store.update(base).await?;
        info!(checker = %checker.full_path(), "attached checker workflow");
        Ok(checker)
    }
}

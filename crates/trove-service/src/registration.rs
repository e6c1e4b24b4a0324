//! Entry registration
//!
//! Manual registration of tools and workflows, creation of hosted entries,
//! and entry deletion. Auto-discovery (bulk organization scans) reuses the
//! same creation path per repository found.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};
use trove_core::{DescriptorType, Entry, EntryId, EntryKind, EntryMode};
use trove_store::EntryRepository;

use crate::dto::{CreateHostedRequest, RegisterToolRequest, RegisterWorkflowRequest};
use crate::error::{ServiceError, ServiceResult};

/// Synthetic origin for hosted entries, which have no external
/// source-control or registry home.
pub const HOSTED_ORIGIN: &str = "trove.io";

/// Trait for entry registration operations
#[async_trait]
pub trait RegistrationService: Send + Sync {
    /// Register an image-registry-backed tool as a stub.
    async fn register_tool(&self, subject: &str, request: RegisterToolRequest) -> ServiceResult<Entry>;

    /// Register a source-control-backed workflow as a stub.
    async fn register_workflow(
        &self,
        subject: &str,
        request: RegisterWorkflowRequest,
    ) -> ServiceResult<Entry>;

    /// Create a hosted entry; its versions come from uploads only.
    async fn create_hosted(&self, subject: &str, request: CreateHostedRequest) -> ServiceResult<Entry>;

    /// Delete an unpublished entry the subject owns, cascading versions
    /// and aliases.
    async fn delete_entry(&self, subject: &str, id: &EntryId) -> ServiceResult<()>;
}

/// Default implementation of RegistrationService
pub struct DefaultRegistrationService {
    store: Arc<dyn EntryRepository>,
}

impl DefaultRegistrationService {
    pub fn new(store: Arc<dyn EntryRepository>) -> Self {
        Self { store }
    }

    fn default_descriptor_path(descriptor_type: DescriptorType) -> String {
        match descriptor_type {
            DescriptorType::Cwl => "/Dockstore.cwl".to_string(),
            DescriptorType::Wdl => "/Dockstore.wdl".to_string(),
            DescriptorType::Nextflow => "/main.nf".to_string(),
        }
    }
}

#[async_trait]
impl RegistrationService for DefaultRegistrationService {
    #[instrument(skip(self, request), fields(path = %format!("{}/{}/{}", request.registry, request.namespace, request.name)))]
    async fn register_tool(&self, subject: &str, request: RegisterToolRequest) -> ServiceResult<Entry> {
        info!("registering tool");
        let mut entry = Entry::new(
            EntryKind::Tool {
                registry: request.registry,
                namespace: request.namespace,
                name: request.name,
                source_control: request.source_control,
                organization: request.organization,
                repository: request.repository,
            },
            request.tool_name,
            request.descriptor_type,
            request.descriptor_path,
            subject,
        )?;
        entry.default_dockerfile_path = request.dockerfile_path;
        Ok(self.store.create(entry).await?)
    }

    #[instrument(skip(self, request), fields(path = %format!("{}/{}/{}", request.source_control, request.organization, request.repository)))]
    async fn register_workflow(
        &self,
        subject: &str,
        request: RegisterWorkflowRequest,
    ) -> ServiceResult<Entry> {
        info!("registering workflow");
        let entry = Entry::new(
            EntryKind::Workflow {
                source_control: request.source_control,
                organization: request.organization,
                repository: request.repository,
                checker_of: None,
            },
            request.workflow_name,
            request.descriptor_type,
            request.descriptor_path,
            subject,
        )?;
        Ok(self.store.create(entry).await?)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create_hosted(&self, subject: &str, request: CreateHostedRequest) -> ServiceResult<Entry> {
        info!("creating hosted entry");
        let descriptor_path = Self::default_descriptor_path(request.descriptor_type);
        let kind = match request.class {
            trove_core::EntryClass::Tool => EntryKind::Tool {
                registry: format!("registry.{HOSTED_ORIGIN}"),
                namespace: subject.to_string(),
                name: request.name,
                source_control: HOSTED_ORIGIN.to_string(),
                organization: subject.to_string(),
                repository: String::new(),
            },
            trove_core::EntryClass::Workflow => EntryKind::Workflow {
                source_control: HOSTED_ORIGIN.to_string(),
                organization: subject.to_string(),
                repository: request.name,
                checker_of: None,
            },
        };
        let mut entry = Entry::new(
            kind,
            request.secondary_name,
            request.descriptor_type,
            descriptor_path,
            subject,
        )?;
        entry.mode = EntryMode::Hosted;
        Ok(self.store.create(entry).await?)
    }

    #[instrument(skip(self))]
    async fn delete_entry(&self, subject: &str, id: &EntryId) -> ServiceResult<()> {
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
        let _guard = self.store.lock_entry(id).await?;
        self.store.delete(id).await?;
        Ok(())
    }
}

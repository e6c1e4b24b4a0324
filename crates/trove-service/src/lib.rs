//! Service layer for the Trove catalog
//!
//! This crate sits between the HTTP surfaces and the store. It implements
//! registration, synchronization against source control and registries,
//! hosted editing, checker linking, and lifecycle operations.
//!
//! # Architecture
//!
//! - **RegistrationService**: entry creation and deletion
//! - **RefreshService**: version-set synchronization and restub
//! - **HostedEditor**: file-patch editing of hosted entries
//! - **CheckerWorkflowLinker**: checker workflow attachment
//! - **LifecycleService**: publication, snapshots, defaults, aliases
//! - **ImageResolver**: image reference resolution across registries
//!
//! External collaborators (source-control hosts, descriptor parsers,
//! image registries) enter through the capability traits in [`providers`].

pub mod checker;
pub mod dto;
pub mod error;
pub mod hosted;
pub mod lifecycle;
pub mod providers;
pub mod refresh;
pub mod registration;
pub mod resolver;

// Re-export main types for convenience
pub use dto::*;
pub use error::{ServiceError, ServiceResult};

// Re-export service traits and implementations
pub use checker::{CheckerWorkflowLinker, DefaultCheckerWorkflowLinker};
pub use hosted::{DefaultHostedEditor, HostedEditor};
pub use lifecycle::{DefaultLifecycleService, LifecycleService};
pub use providers::{
    DescriptorParser, ImageRegistryClient, ManifestInfo, ParsedDescriptor, RepoRef,
    SourceCodeProvider,
};
pub use refresh::{DefaultRefreshService, RefreshService};
pub use registration::{DefaultRegistrationService, RegistrationService};
pub use resolver::{ensure_freezable, ImageResolver};

use std::sync::Arc;
use trove_store::EntryRepository;

/// Service registry that holds all service instances
///
/// This provides a convenient way to manage all services together and
/// ensures consistent dependency injection.
#[derive(Clone)]
pub struct ServiceRegistry {
    /// Registration service
    pub registration: Arc<dyn RegistrationService>,
    /// Refresh service
    pub refresh: Arc<dyn RefreshService>,
    /// Hosted editor
    pub hosted: Arc<dyn HostedEditor>,
    /// Checker workflow linker
    pub checker: Arc<dyn CheckerWorkflowLinker>,
    /// Lifecycle service
    pub lifecycle: Arc<dyn LifecycleService>,
    /// Shared store handle, used directly by read-only surfaces
    pub store: Arc<dyn EntryRepository>,
}

impl ServiceRegistry {
    /// Create a new service registry with default implementations.
    ///
    /// # Arguments
    ///
    /// * `store` - Entry repository implementation
    /// * `providers` - Source-control providers keyed by host
    /// * `parser` - Descriptor parser
    /// * `registries` - Image registry clients
    pub fn new(
        store: Arc<dyn EntryRepository>,
        providers: Vec<(String, Arc<dyn SourceCodeProvider>)>,
        parser: Arc<dyn DescriptorParser>,
        registries: Vec<Arc<dyn ImageRegistryClient>>,
    ) -> Self {
        let resolver = Arc::new(ImageResolver::new(registries));

        let registration = Arc::new(DefaultRegistrationService::new(store.clone()));
        let refresh = Arc::new(DefaultRefreshService::new(
            store.clone(),
            providers,
            parser,
            resolver,
        ));
        let hosted = Arc::new(DefaultHostedEditor::new(store.clone()));
        let checker = Arc::new(DefaultCheckerWorkflowLinker::new(store.clone()));
        let lifecycle = Arc::new(DefaultLifecycleService::new(store.clone()));

        Self {
            registration,
            refresh,
            hosted,
            checker,
            lifecycle,
            store,
        }
    }
}

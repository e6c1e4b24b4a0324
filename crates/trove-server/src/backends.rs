//! Collaborator wiring
//!
//! Source-control hosts, descriptor parsers, and image registries plug in
//! behind the capability traits in `trove-service`. A stock deployment
//! starts with none configured; write operations that need one fail with
//! an upstream error until an integration is wired in.

use async_trait::async_trait;
use trove_core::Entry;
use trove_service::{
    DescriptorParser, ParsedDescriptor, RepoRef, ServiceError, ServiceResult,
};

/// Parser used when no descriptor backend is configured.
pub struct UnconfiguredParser;

#[async_trait]
impl DescriptorParser for UnconfiguredParser {
    async fn parse(
        &self,
        _entry: &Entry,
        _reference: &RepoRef,
        _primary_path: &str,
    ) -> ServiceResult<ParsedDescriptor> {
        Err(ServiceError::Upstream(
            "No descriptor parsing backend configured".to_string(),
        ))
    }
}

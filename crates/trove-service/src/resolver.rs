//! Image reference resolution
//!
//! Turns image reference strings into concrete, checksum-addressed image
//! records by querying per-registry clients. Digest-pinned references
//! resolve by digest alone; tag references resolve the registry's current
//! mapping at sync time. Multi-architecture manifest lists expand to one
//! image per architecture.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use trove_core::{dedup_images, Checksum, Image, ImageReference, Version};

use crate::error::{ServiceError, ServiceResult};
use crate::providers::{ImageRegistryClient, ManifestInfo};

/// Registry host assumed when a reference carries none.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Resolves image references across registries.
pub struct ImageResolver {
    clients: HashMap<String, Arc<dyn ImageRegistryClient>>,
}

impl ImageResolver {
    pub fn new(clients: Vec<Arc<dyn ImageRegistryClient>>) -> Self {
        let clients = clients
            .into_iter()
            .map(|c| (c.registry_host().to_string(), c))
            .collect();
        Self { clients }
    }

    /// Split a parsed reference into (registry host, in-registry
    /// repository). The first path segment is a host when it contains a
    /// dot or port separator.
    pub fn split_registry(reference: &ImageReference) -> (String, String) {
        match reference.repository.split_once('/') {
            Some((first, rest)) if first.contains('.') || first.contains(':') => {
                (first.to_string(), rest.to_string())
            }
            _ => (DEFAULT_REGISTRY.to_string(), reference.repository.clone()),
        }
    }

    fn client_for(&self, host: &str) -> ServiceResult<&Arc<dyn ImageRegistryClient>> {
        self.clients.get(host).ok_or_else(|| {
            ServiceError::Upstream(format!("No registry client configured for {host}"))
        })
    }

    /// True when the registry serving `host` requires a credential that is
    /// not linked. Unknown hosts report false; resolution against them
    /// fails later with a clearer error.
    pub fn token_missing(&self, host: &str) -> bool {
        self.clients
            .get(host)
            .map(|c| c.token_missing())
            .unwrap_or(false)
    }

    /// Resolve one reference string into zero or more image records.
    ///
    /// Parameterized (late-bound) references cannot be resolved at sync
    /// time and yield no images; they still count against snapshot
    /// eligibility via [`ensure_freezable`].
    #[instrument(skip(self))]
    pub async fn resolve(&self, raw: &str) -> ServiceResult<Vec<Image>> {
        let reference: ImageReference = raw.parse().map_err(ServiceError::from)?;
        if reference.parameterized {
            debug!(reference = raw, "skipping late-bound image reference");
            return Ok(Vec::new());
        }
        let (host, repository) = Self::split_registry(&reference);
        let client = self.client_for(&host)?;

        // A digest pin wins over any accompanying tag, even when registry
        // lookup by tag would disagree.
        let manifests = match &reference.digest {
            Some(digest) => {
                client
                    .list_manifests_by_digest(&repository, digest)
                    .await?
            }
            None => {
                let tag = reference.effective_tag().unwrap_or("latest");
                client.list_manifests_by_tag(&repository, tag).await?
            }
        };

        let mut images = Vec::with_capacity(manifests.len());
        for manifest in manifests {
            images.push(self.to_image(&host, &repository, &reference, manifest)?);
        }
        Ok(dedup_images(images))
    }

    fn to_image(
        &self,
        host: &str,
        repository: &str,
        reference: &ImageReference,
        manifest: ManifestInfo,
    ) -> ServiceResult<Image> {
        let checksum = Checksum::from_digest(&manifest.digest)?;
        Ok(Image {
            registry: host.to_string(),
            repository: repository.to_string(),
            tag: reference.tag.clone(),
            digest: Some(manifest.digest),
            architecture: manifest.architecture,
            size: manifest.size,
            checksums: vec![checksum],
        })
    }
}

/// Check the snapshot precondition for a version: every image reference
/// must be digest-pinned or use a stable (non-`latest`) tag, and none may
/// be late-bound.
pub fn ensure_freezable(version: &Version) -> ServiceResult<()> {
    for reference in &version.image_references {
        if reference.is_floating() {
            let reason = if reference.parameterized {
                format!("image reference '{reference}' is bound through a parameter")
            } else {
                format!("image reference '{reference}' uses the floating latest tag")
            };
            return Err(ServiceError::SnapshotIneligible {
                version: version.name.clone(),
                reason,
            });
        }
    }
    Ok(())
}

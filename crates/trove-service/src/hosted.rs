//! Hosted entry editing
//!
//! Hosted entries have no upstream to sync from; their versions are built
//! from uploaded file patches. Each edit creates a new immutable version
//! named with the next integer never issued before, counting retired names
//! so a deleted version's name is never reused.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use trove_core::{
    source_file::normalize_path, DescriptorType, Entry, EntryId, FileType, ReferenceType,
    SourceFile, Version,
};
use trove_store::EntryRepository;

use crate::dto::FilePatch;
use crate::error::{ServiceError, ServiceResult};

/// Default cap on live versions per hosted entry.
pub const DEFAULT_VERSION_LIMIT: usize = 100;

/// Trait for hosted entry editing
#[async_trait]
pub trait HostedEditor: Send + Sync {
    /// Apply a sparse file patch on top of the latest surviving version,
    /// producing a new version. Non-null content adds or replaces a file,
    /// null content deletes it, files absent from the patch carry over.
    async fn edit_version(
        &self,
        subject: &str,
        id: &EntryId,
        patches: Vec<FilePatch>,
    ) -> ServiceResult<Entry>;

    /// Delete one hosted version. The name joins the retired list and is
    /// never issued again.
    async fn delete_version(&self, subject: &str, id: &EntryId, name: &str) -> ServiceResult<Entry>;
}

/// Default implementation of HostedEditor
pub struct DefaultHostedEditor {
    store: Arc<dyn EntryRepository>,
    version_limit: usize,
}

impl DefaultHostedEditor {
    pub fn new(store: Arc<dyn EntryRepository>) -> Self {
        Self {
            store,
            version_limit: DEFAULT_VERSION_LIMIT,
        }
    }

    pub fn with_version_limit(store: Arc<dyn EntryRepository>, version_limit: usize) -> Self {
        Self {
            store,
            version_limit,
        }
    }

    async fn load_hosted(&self, subject: &str, id: &EntryId) -> ServiceResult<Entry> {
        let entry = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entry {id} not found")))?;
        if !entry.is_hosted() {
            return Err(ServiceError::Validation(format!(
                "{} is not a hosted entry",
                entry.full_path()
            )));
        }
        if !entry.is_owner(subject) {
            return Err(ServiceError::Authorization(format!(
                "{subject} does not own {}",
                entry.full_path()
            )));
        }
        Ok(entry)
    }

    /// Next version name: one past the highest integer ever issued, over
    /// both live and retired names. Starts at "1".
    fn next_version_name(entry: &Entry) -> String {
        let live = entry.versions.iter().filter_map(|v| v.numeric_name());
        let retired = entry
            .retired_version_names
            .iter()
            .filter_map(|n| n.parse::<u64>().ok());
        let highest = live.chain(retired).max().unwrap_or(0);
        (highest + 1).to_string()
    }

    /// The version the patch applies against: highest live numeric name.
    fn predecessor(entry: &Entry) -> Option<&Version> {
        entry
            .versions
            .iter()
            .filter(|v| v.numeric_name().is_some())
            .max_by_key(|v| v.numeric_name())
    }

    fn classify(entry: &Entry, path: &str) -> FileType {
        if path == entry.default_descriptor_path {
            return FileType::PrimaryDescriptor;
        }
        let file_name = path.rsplit('/').next().unwrap_or(path);
        if file_name.starts_with("Dockerfile") {
            return FileType::Dockerfile;
        }
        let descriptor_ext = match entry.descriptor_type {
            DescriptorType::Cwl => ".cwl",
            DescriptorType::Wdl => ".wdl",
            DescriptorType::Nextflow => ".nf",
        };
        if path.ends_with(descriptor_ext) {
            FileType::SecondaryDescriptor
        } else if path.ends_with(".json") {
            FileType::TestParameter
        } else {
            FileType::Other
        }
    }

    /// Validate and normalize the patch before any mutation. Rejects
    /// duplicate paths and paths without a terminal file segment.
    fn normalize_patch(patches: Vec<FilePatch>) -> ServiceResult<Vec<FilePatch>> {
        if patches.is_empty() {
            return Err(ServiceError::Validation(
                "Edit contains no file changes".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        let mut normalized = Vec::with_capacity(patches.len());
        for patch in patches {
            let path = normalize_path(patch.path)?;
            if !seen.insert(path.clone()) {
                return Err(ServiceError::Validation(format!(
                    "Duplicate path {path} in edit"
                )));
            }
            normalized.push(FilePatch {
                path,
                content: patch.content,
            });
        }
        Ok(normalized)
    }
}

#[async_trait]
impl HostedEditor for DefaultHostedEditor {
    #[instrument(skip(self, patches))]
    async fn edit_version(
        &self,
        subject: &str,
        id: &EntryId,
        patches: Vec<FilePatch>,
    ) -> ServiceResult<Entry> {
        let patches = Self::normalize_patch(patches)?;
        self.load_hosted(subject, id).await?;

        let _guard = self.store.lock_entry(id).await?;
        let mut entry = self.load_hosted(subject, id).await?;

        if entry.versions.len() >= self.version_limit {
            return Err(ServiceError::Validation(format!(
                "{} has reached the hosted version limit of {}",
                entry.full_path(),
                self.version_limit
            )));
        }

        let mut files: BTreeMap<String, SourceFile> = Self::predecessor(&entry)
            .map(|v| {
                v.source_files
                    .iter()
                    .map(|f| (f.path.clone(), f.clone()))
                    .collect()
            })
            .unwrap_or_default();

        for patch in patches {
            match patch.content {
                Some(content) => {
                    let file_type = Self::classify(&entry, &patch.path);
                    files.insert(
                        patch.path.clone(),
                        SourceFile::new(patch.path, file_type, content)?,
                    );
                }
                None => {
                    if files.remove(&patch.path).is_none() {
                        return Err(ServiceError::Validation(format!(
                            "Cannot delete {}: not present in the previous version",
                            patch.path
                        )));
                    }
                }
            }
        }

        let name = Self::next_version_name(&entry);
        let mut version = Version::new(
            name.clone(),
            ReferenceType::Hosted,
            entry.default_descriptor_path.clone(),
        );
        version.source_files = files.into_values().collect();
        version.valid = version.primary_descriptor().is_some();
        version.editor = Some(subject.to_string());

        entry.add_version(version)?;
        entry.default_version = Some(name.clone());
        info!(version = %name, "created hosted version");
        Ok(self.store.update(entry).await?)
    }

    #[instrument(skip(self))]
    async fn delete_version(&self, subject: &str, id: &EntryId, name: &str) -> ServiceResult<Entry> {
        self.load_hosted(subject, id).await?;

        let _guard = self.store.lock_entry(id).await?;
        let mut entry = self.load_hosted(subject, id).await?;
        entry.remove_version(name)?;
        Ok(self.store.update(entry).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::CreateHostedRequest;
    use crate::registration::{DefaultRegistrationService, RegistrationService};
    use trove_core::EntryClass;
    use trove_store::InMemoryEntryStore;

    struct Harness {
        store: Arc<InMemoryEntryStore>,
        editor: DefaultHostedEditor,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(InMemoryEntryStore::new());
            let editor = DefaultHostedEditor::new(store.clone() as Arc<dyn EntryRepository>);
            Self { store, editor }
        }

        fn with_limit(limit: usize) -> Self {
            let store = Arc::new(InMemoryEntryStore::new());
            let editor = DefaultHostedEditor::with_version_limit(
                store.clone() as Arc<dyn EntryRepository>,
                limit,
            );
            Self { store, editor }
        }

        async fn hosted_workflow(&self) -> Entry {
            let registration =
                DefaultRegistrationService::new(self.store.clone() as Arc<dyn EntryRepository>);
            registration
                .create_hosted(
                    "alice",
                    CreateHostedRequest {
                        class: EntryClass::Workflow,
                        descriptor_type: DescriptorType::Wdl,
                        name: "wf".to_string(),
                        secondary_name: None,
                    },
                )
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_first_edit_creates_version_one() {
        let h = Harness::new();
        let entry = h.hosted_workflow().await;
        let entry = h
            .editor
            .edit_version(
                "alice",
                &entry.id,
                vec![FilePatch::put("/Dockstore.wdl", "workflow w {}")],
            )
            .await
            .unwrap();

        let version = entry.find_version("1").unwrap();
        assert!(version.valid);
        assert_eq!(version.reference_type, ReferenceType::Hosted);
        assert_eq!(version.editor.as_deref(), Some("alice"));
        assert_eq!(entry.default_version.as_deref(), Some("1"));
        assert_eq!(
            version.primary_descriptor().unwrap().path,
            "/Dockstore.wdl"
        );
    }

    #[tokio::test]
    async fn test_sparse_patch_carries_over_absent_files() {
        let h = Harness::new();
        let entry = h.hosted_workflow().await;
        h.editor
            .edit_version(
                "alice",
                &entry.id,
                vec![
                    FilePatch::put("/Dockstore.wdl", "workflow w {}"),
                    FilePatch::put("/test.json", "{}"),
                ],
            )
            .await
            .unwrap();
        let entry = h
            .editor
            .edit_version(
                "alice",
                &entry.id,
                vec![FilePatch::put("/Dockstore.wdl", "workflow w2 {}")],
            )
            .await
            .unwrap();

        let version = entry.find_version("2").unwrap();
        assert_eq!(version.source_files.len(), 2);
        assert!(version.find_file("/test.json").is_some());
        assert!(version
            .find_file("/Dockstore.wdl")
            .unwrap()
            .content
            .as_deref()
            .unwrap()
            .contains("w2"));
    }

    #[tokio::test]
    async fn test_null_content_deletes_and_missing_delete_rejected() {
        let h = Harness::new();
        let entry = h.hosted_workflow().await;
        h.editor
            .edit_version(
                "alice",
                &entry.id,
                vec![
                    FilePatch::put("/Dockstore.wdl", "workflow w {}"),
                    FilePatch::put("/test.json", "{}"),
                ],
            )
            .await
            .unwrap();

        let entry = h
            .editor
            .edit_version("alice", &entry.id, vec![FilePatch::delete("/test.json")])
            .await
            .unwrap();
        assert!(entry.find_version("2").unwrap().find_file("/test.json").is_none());

        let err = h
            .editor
            .edit_version("alice", &entry.id, vec![FilePatch::delete("/nope.txt")])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deleted_names_are_never_reused() {
        let h = Harness::new();
        let entry = h.hosted_workflow().await;
        for _ in 0..3 {
            h.editor
                .edit_version(
                    "alice",
                    &entry.id,
                    vec![FilePatch::put("/Dockstore.wdl", "workflow w {}")],
                )
                .await
                .unwrap();
        }

        h.editor.delete_version("alice", &entry.id, "3").await.unwrap();
        h.editor.delete_version("alice", &entry.id, "2").await.unwrap();
        h.editor.delete_version("alice", &entry.id, "1").await.unwrap();

        let entry = h
            .editor
            .edit_version(
                "alice",
                &entry.id,
                vec![FilePatch::put("/Dockstore.wdl", "workflow w {}")],
            )
            .await
            .unwrap();
        assert!(entry.find_version("4").is_some());
        assert!(entry.find_version("1").is_none());
    }

    #[tokio::test]
    async fn test_delete_default_reassigns_to_next_highest() {
        let h = Harness::new();
        let entry = h.hosted_workflow().await;
        for _ in 0..3 {
            h.editor
                .edit_version(
                    "alice",
                    &entry.id,
                    vec![FilePatch::put("/Dockstore.wdl", "workflow w {}")],
                )
                .await
                .unwrap();
        }

        let entry = h.editor.delete_version("alice", &entry.id, "3").await.unwrap();
        assert_eq!(entry.default_version.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_frozen_version_cannot_be_deleted() {
        let h = Harness::new();
        let entry = h.hosted_workflow().await;
        let mut entry = h
            .editor
            .edit_version(
                "alice",
                &entry.id,
                vec![FilePatch::put("/Dockstore.wdl", "workflow w {}")],
            )
            .await
            .unwrap();

        entry.find_version_mut("1").unwrap().frozen = true;
        let entry = h.store.update(entry).await.unwrap();

        let err = h
            .editor
            .delete_version("alice", &entry.id, "1")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_invalid_paths_rejected_before_mutation() {
        let h = Harness::new();
        let entry = h.hosted_workflow().await;

        for bad in ["/", "/dir/", ""] {
            let err = h
                .editor
                .edit_version(
                    "alice",
                    &entry.id,
                    vec![
                        FilePatch::put("/Dockstore.wdl", "workflow w {}"),
                        FilePatch::put(bad, "x"),
                    ],
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "path {bad:?}");
        }

        let fetched = h.store.find_by_id(&entry.id).await.unwrap().unwrap();
        assert!(fetched.versions.is_empty());
    }

    #[tokio::test]
    async fn test_version_limit_enforced() {
        let h = Harness::with_limit(2);
        let entry = h.hosted_workflow().await;
        for _ in 0..2 {
            h.editor
                .edit_version(
                    "alice",
                    &entry.id,
                    vec![FilePatch::put("/Dockstore.wdl", "workflow w {}")],
                )
                .await
                .unwrap();
        }

        let err = h
            .editor
            .edit_version(
                "alice",
                &entry.id,
                vec![FilePatch::put("/Dockstore.wdl", "workflow w {}")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_primary_descriptor_marks_invalid() {
        let h = Harness::new();
        let entry = h.hosted_workflow().await;
        let entry = h
            .editor
            .edit_version(
                "alice",
                &entry.id,
                vec![FilePatch::put("/helper.wdl", "task t {}")],
            )
            .await
            .unwrap();
        let version = entry.find_version("1").unwrap();
        assert!(!version.valid);
        assert_eq!(
            version.find_file("/helper.wdl").unwrap().file_type,
            FileType::SecondaryDescriptor
        );
    }

    #[tokio::test]
    async fn test_editing_requires_ownership() {
        let h = Harness::new();
        let entry = h.hosted_workflow().await;
        let err = h
            .editor
            .edit_version(
                "mallory",
                &entry.id,
                vec![FilePatch::put("/Dockstore.wdl", "workflow w {}")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
    }
}

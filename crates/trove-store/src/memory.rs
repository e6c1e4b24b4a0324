//! In-memory entry store
//!
//! Backs the repository trait with hash maps behind an `RwLock`, plus a
//! per-entry mutex map implementing the single-writer-per-entry
//! discipline. This is the store the test suites run against; a
//! relational implementation satisfies the same trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use trove_core::{CatalogError, Entry, EntryClass, EntryId, EntryMode};

use crate::error::{StoreError, StoreResult};
use crate::repository::{EntryQuery, EntryRepository};

#[derive(Default)]
struct StoreInner {
    entries: HashMap<EntryId, Entry>,
    /// (class, full path) -> id
    paths: HashMap<(EntryClass, String), EntryId>,
    entry_aliases: HashMap<String, EntryId>,
    version_aliases: HashMap<String, (EntryId, String)>,
}

impl StoreInner {
    fn alias_taken(&self, alias: &str) -> bool {
        self.entry_aliases.contains_key(alias) || self.version_aliases.contains_key(alias)
    }
}

/// In-memory implementation of [`EntryRepository`].
#[derive(Default)]
pub struct InMemoryEntryStore {
    inner: RwLock<StoreInner>,
    locks: Mutex<HashMap<EntryId, Arc<Mutex<()>>>>,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject entry states that break catalog invariants before they are
    /// stored.
    fn check_invariants(entry: &Entry) -> StoreResult<()> {
        if entry.mode == EntryMode::Stub && !entry.versions.is_empty() {
            return Err(StoreError::Domain(CatalogError::Internal(format!(
                "Stub entry {} must not carry versions",
                entry.full_path()
            ))));
        }
        if let Some(ref default) = entry.default_version {
            if entry.find_version(default).is_none() {
                return Err(StoreError::Domain(CatalogError::Internal(format!(
                    "Default version '{default}' does not exist on {}",
                    entry.full_path()
                ))));
            }
        }
        let mut names: Vec<&str> = entry.versions.iter().map(|v| v.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(StoreError::Domain(CatalogError::Internal(format!(
                "Duplicate version names on {}",
                entry.full_path()
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl EntryRepository for InMemoryEntryStore {
    async fn create(&self, entry: Entry) -> StoreResult<Entry> {
        Self::check_invariants(&entry)?;
        let mut inner = self.inner.write().await;
        let key = (entry.class(), entry.full_path());
        if inner.paths.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "A {} already exists at {}",
                key.0, key.1
            )));
        }
        debug!(path = %key.1, "creating entry");
        inner.paths.insert(key, entry.id);
        inner.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn find_by_id(&self, id: &EntryId) -> StoreResult<Option<Entry>> {
        let inner = self.inner.read().await;
        Ok(inner.entries.get(id).cloned())
    }

    async fn find_by_path(&self, class: EntryClass, full_path: &str) -> StoreResult<Option<Entry>> {
        let inner = self.inner.read().await;
        let id = inner.paths.get(&(class, full_path.to_string()));
        Ok(id.and_then(|id| inner.entries.get(id)).cloned())
    }

    async fn update(&self, entry: Entry) -> StoreResult<Entry> {
        Self::check_invariants(&entry)?;
        let mut inner = self.inner.write().await;
        let existing = inner
            .entries
            .get(&entry.id)
            .ok_or_else(|| StoreError::NotFound(format!("Entry {} not found", entry.id)))?;

        // Path components may change (secondary name updates); keep the
        // path index consistent and unique.
        let old_key = (existing.class(), existing.full_path());
        let new_key = (entry.class(), entry.full_path());
        if old_key != new_key {
            if inner.paths.contains_key(&new_key) {
                return Err(StoreError::Conflict(format!(
                    "A {} already exists at {}",
                    new_key.0, new_key.1
                )));
            }
            inner.paths.remove(&old_key);
            inner.paths.insert(new_key, entry.id);
        }
        inner.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn delete(&self, id: &EntryId) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("Entry {id} not found")))?;
        if entry.published {
            return Err(StoreError::Conflict(format!(
                "Entry {} is published and cannot be deleted",
                entry.full_path()
            )));
        }
        let key = (entry.class(), entry.full_path());
        inner.paths.remove(&key);
        inner.entries.remove(id);
        inner.entry_aliases.retain(|_, target| target != id);
        inner.version_aliases.retain(|_, (target, _)| target != id);
        Ok(())
    }

    async fn list(&self, query: &EntryQuery) -> StoreResult<Vec<Entry>> {
        let inner = self.inner.read().await;
        let mut matched: Vec<Entry> = inner
            .entries
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.full_path());
        let iter = matched.into_iter().skip(query.offset);
        Ok(if query.limit > 0 {
            iter.take(query.limit).collect()
        } else {
            iter.collect()
        })
    }

    async fn add_entry_alias(&self, id: &EntryId, alias: &str) -> StoreResult<()> {
        if alias.is_empty() {
            return Err(StoreError::Domain(CatalogError::validation(
                "Alias cannot be empty",
            )));
        }
        let mut inner = self.inner.write().await;
        if !inner.entries.contains_key(id) {
            return Err(StoreError::NotFound(format!("Entry {id} not found")));
        }
        if inner.alias_taken(alias) {
            return Err(StoreError::Conflict(format!(
                "Alias '{alias}' is already in use"
            )));
        }
        inner.entry_aliases.insert(alias.to_string(), *id);
        Ok(())
    }

    async fn add_version_alias(&self, id: &EntryId, version: &str, alias: &str) -> StoreResult<()> {
        if alias.is_empty() {
            return Err(StoreError::Domain(CatalogError::validation(
                "Alias cannot be empty",
            )));
        }
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("Entry {id} not found")))?;
        if entry.find_version(version).is_none() {
            return Err(StoreError::NotFound(format!(
                "Version '{version}' not found on {}",
                entry.full_path()
            )));
        }
        if inner.alias_taken(alias) {
            return Err(StoreError::Conflict(format!(
                "Alias '{alias}' is already in use"
            )));
        }
        inner
            .version_aliases
            .insert(alias.to_string(), (*id, version.to_string()));
        Ok(())
    }

    async fn resolve_entry_alias(&self, alias: &str) -> StoreResult<Option<EntryId>> {
        let inner = self.inner.read().await;
        Ok(inner.entry_aliases.get(alias).copied())
    }

    async fn resolve_version_alias(&self, alias: &str) -> StoreResult<Option<(EntryId, String)>> {
        let inner = self.inner.read().await;
        Ok(inner.version_aliases.get(alias).cloned())
    }

    async fn lock_entry(&self, id: &EntryId) -> StoreResult<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(*id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        Ok(lock.lock_owned().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_core::{DescriptorType, EntryKind, ReferenceType, Version};

    fn workflow(repo: &str) -> Entry {
        Entry::new(
            EntryKind::Workflow {
                source_control: "github.com".to_string(),
                organization: "org".to_string(),
                repository: repo.to_string(),
                checker_of: None,
            },
            None,
            DescriptorType::Cwl,
            "/Dockstore.cwl",
            "alice",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryEntryStore::new();
        let entry = store.create(workflow("repo")).await.unwrap();

        let by_id = store.find_by_id(&entry.id).await.unwrap().unwrap();
        assert_eq!(by_id.full_path(), "github.com/org/repo");

        let by_path = store
            .find_by_path(EntryClass::Workflow, "github.com/org/repo")
            .await
            .unwrap();
        assert!(by_path.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_path_rejected() {
        let store = InMemoryEntryStore::new();
        let first = store.create(workflow("repo")).await.unwrap();
        let mut with_versions = first.clone();
        with_versions.mode = EntryMode::Full;
        with_versions
            .add_version(Version::new("main", ReferenceType::Branch, "/Dockstore.cwl"))
            .unwrap();
        store.update(with_versions).await.unwrap();

        let err = store.create(workflow("repo")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // the existing entry's version set is untouched
        let existing = store.find_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(existing.versions.len(), 1);
    }

    #[tokio::test]
    async fn test_same_path_different_tool_name_allowed() {
        let store = InMemoryEntryStore::new();
        store.create(workflow("repo")).await.unwrap();
        let mut named = workflow("repo");
        named.tool_name = Some("alt".to_string());
        assert!(store.create(named).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_rejects_dangling_default() {
        let store = InMemoryEntryStore::new();
        let mut entry = store.create(workflow("repo")).await.unwrap();
        entry.default_version = Some("ghost".to_string());
        assert!(store.update(entry).await.is_err());
    }

    #[tokio::test]
    async fn test_stub_with_versions_rejected() {
        let store = InMemoryEntryStore::new();
        let mut entry = store.create(workflow("repo")).await.unwrap();
        entry
            .versions
            .push(Version::new("main", ReferenceType::Branch, "/Dockstore.cwl"));
        assert!(store.update(entry).await.is_err());
    }

    #[tokio::test]
    async fn test_published_entry_cannot_be_deleted() {
        let store = InMemoryEntryStore::new();
        let mut entry = store.create(workflow("repo")).await.unwrap();
        entry.mode = EntryMode::Full;
        entry.published = true;
        let entry = store.update(entry).await.unwrap();

        let err = store.delete(&entry.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_alias_namespaces_are_disjoint() {
        let store = InMemoryEntryStore::new();
        let mut entry = workflow("repo");
        entry.mode = EntryMode::Full;
        entry
            .add_version(Version::new("main", ReferenceType::Branch, "/Dockstore.cwl"))
            .unwrap();
        let entry = store.create(entry).await.unwrap();

        store.add_entry_alias(&entry.id, "fancy-alias").await.unwrap();

        // same alias text cannot bind to a version
        let err = store
            .add_version_alias(&entry.id, "main", "fancy-alias")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // original binding unaffected
        let resolved = store.resolve_entry_alias("fancy-alias").await.unwrap();
        assert_eq!(resolved, Some(entry.id));
    }

    #[tokio::test]
    async fn test_version_alias_requires_existing_version() {
        let store = InMemoryEntryStore::new();
        let entry = store.create(workflow("repo")).await.unwrap();
        let err = store
            .add_version_alias(&entry.id, "ghost", "a1")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_aliases() {
        let store = InMemoryEntryStore::new();
        let entry = store.create(workflow("repo")).await.unwrap();
        store.add_entry_alias(&entry.id, "doomed").await.unwrap();
        store.delete(&entry.id).await.unwrap();
        assert_eq!(store.resolve_entry_alias("doomed").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_lock_serializes_writers() {
        let store = Arc::new(InMemoryEntryStore::new());
        let entry = store.create(workflow("repo")).await.unwrap();

        let guard = store.lock_entry(&entry.id).await.unwrap();
        let store2 = store.clone();
        let id = entry.id;
        let contender = tokio::spawn(async move { store2.lock_entry(&id).await.unwrap() });

        // the second writer cannot acquire while the first holds the guard
        tokio::task::yield_now().await;
        assert!(!contender.is_finished());
        drop(guard);
        contender.await.unwrap();
    }
}

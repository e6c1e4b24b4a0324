//! Repository trait abstraction for entry persistence
//!
//! This module defines the [`EntryRepository`] trait that abstracts the
//! storage engine, allowing in-memory and relational implementations to be
//! swapped behind the same contract.

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use trove_core::{Entry, EntryClass, EntryId};

use crate::error::StoreResult;

/// Query parameters for listing entries
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    /// Restrict to one entry class
    pub class: Option<EntryClass>,

    /// Filter by organization/namespace path component
    pub organization: Option<String>,

    /// Filter by base name (repository or tool name)
    pub name: Option<String>,

    /// Filter by secondary name
    pub tool_name: Option<String>,

    /// Substring match on the derived description
    pub description: Option<String>,

    /// Filter by derived author
    pub author: Option<String>,

    /// Only entries that have (or are) checker workflows
    pub checker: Option<bool>,

    /// Only published entries
    pub published_only: bool,

    /// Number of results to skip
    pub offset: usize,

    /// Maximum number of results (0 means unbounded)
    pub limit: usize,
}

impl EntryQuery {
    /// Query over published entries only, the TRS default.
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Default::default()
        }
    }

    pub fn class(mut self, class: EntryClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn checker(mut self, checker: bool) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Whether an entry matches every set filter.
    pub fn matches(&self, entry: &Entry) -> bool {
        if self.published_only && !entry.published {
            return false;
        }
        if let Some(class) = self.class {
            if entry.class() != class {
                return false;
            }
        }
        if let Some(ref org) = self.organization {
            let entry_org = match &entry.kind {
                trove_core::EntryKind::Tool { namespace, .. } => namespace,
                trove_core::EntryKind::Workflow { organization, .. } => organization,
            };
            if entry_org != org {
                return false;
            }
        }
        if let Some(ref name) = self.name {
            if entry.kind.base_name() != name {
                return false;
            }
        }
        if let Some(ref tool_name) = self.tool_name {
            if entry.tool_name.as_deref() != Some(tool_name.as_str()) {
                return false;
            }
        }
        if let Some(ref needle) = self.description {
            match &entry.description {
                Some(d) if d.contains(needle.as_str()) => {}
                _ => return false,
            }
        }
        if let Some(ref author) = self.author {
            if entry.author.as_deref() != Some(author.as_str()) {
                return false;
            }
        }
        if let Some(checker) = self.checker {
            let has_checker = entry.checker_id.is_some();
            if has_checker != checker {
                return false;
            }
        }
        true
    }
}

/// Repository trait for entry persistence
///
/// Implementations must be thread-safe and must enforce:
/// - (class, full path) uniqueness across entries,
/// - alias uniqueness across the disjoint entry and version namespaces,
/// - rejection of writes that break entry-level invariants
///   (stub entries with versions, dangling default versions),
/// - cascade deletion of versions and aliases with their entry.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Persist a new entry.
    ///
    /// Fails with `Conflict` when an entry with the same class and full
    /// path already exists; the existing entry is untouched.
    async fn create(&self, entry: Entry) -> StoreResult<Entry>;

    /// Look up an entry by id.
    async fn find_by_id(&self, id: &EntryId) -> StoreResult<Option<Entry>>;

    /// Look up an entry by class and full path (including any secondary
    /// name).
    async fn find_by_path(&self, class: EntryClass, full_path: &str) -> StoreResult<Option<Entry>>;

    /// Replace the stored entry with the given state.
    ///
    /// The whole entry commits in one step; callers build the complete new
    /// version set first so no partial refresh is ever visible.
    async fn update(&self, entry: Entry) -> StoreResult<Entry>;

    /// Delete an entry and everything it owns.
    ///
    /// Published entries cannot be deleted.
    async fn delete(&self, id: &EntryId) -> StoreResult<()>;

    /// List entries matching the query, ordered by full path.
    async fn list(&self, query: &EntryQuery) -> StoreResult<Vec<Entry>>;

    /// Bind an alias to an entry. Fails with `Conflict` when the alias is
    /// already bound to any entry or version.
    async fn add_entry_alias(&self, id: &EntryId, alias: &str) -> StoreResult<()>;

    /// Bind an alias to a version of an entry. Same uniqueness rule.
    async fn add_version_alias(&self, id: &EntryId, version: &str, alias: &str) -> StoreResult<()>;

    /// Resolve an entry alias.
    async fn resolve_entry_alias(&self, alias: &str) -> StoreResult<Option<EntryId>>;

    /// Resolve a version alias to (entry, version name).
    async fn resolve_version_alias(&self, alias: &str) -> StoreResult<Option<(EntryId, String)>>;

    /// Acquire the per-entry write lock.
    ///
    /// All read-modify-write sequences against one entry must hold this
    /// guard so a refresh and a concurrent hosted edit cannot interleave.
    /// Locks for different entries are independent.
    async fn lock_entry(&self, id: &EntryId) -> StoreResult<OwnedMutexGuard<()>>;
}

//! Catalog entries: tools and workflows
//!
//! `Entry` is the abstract catalog unit. The tool/workflow split is a sum
//! type rather than inheritance so storage and TRS projection can switch
//! exhaustively over kind.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::{CatalogError, Result};
use crate::types::{DescriptorType, EntryId, EntryMode};
use crate::version::{highest_version_name, Version};

/// Broad kind of an entry, for uniqueness scoping and TRS tool classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryClass {
    Tool,
    Workflow,
}

impl fmt::Display for EntryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool => write!(f, "tool"),
            Self::Workflow => write!(f, "workflow"),
        }
    }
}

/// Kind-specific path components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum EntryKind {
    /// Image-registry-backed tool. The registry triple names the tool;
    /// descriptors still sync from the linked source-control repository.
    Tool {
        /// Registry host (`quay.io`, `ghcr.io`, …)
        registry: String,
        namespace: String,
        name: String,
        /// Source-control host the descriptors sync from
        source_control: String,
        organization: String,
        repository: String,
    },
    /// Descriptor-backed workflow
    Workflow {
        /// Source-control host (`github.com`, `bitbucket.org`, …)
        source_control: String,
        organization: String,
        repository: String,
        /// Set when this workflow is the checker of another entry
        #[serde(skip_serializing_if = "Option::is_none")]
        checker_of: Option<EntryId>,
    },
}

impl EntryKind {
    pub fn class(&self) -> EntryClass {
        match self {
            Self::Tool { .. } => EntryClass::Tool,
            Self::Workflow { .. } => EntryClass::Workflow,
        }
    }

    /// Slash-joined path without the secondary name.
    pub fn path(&self) -> String {
        match self {
            Self::Tool {
                registry,
                namespace,
                name,
                ..
            } => format!("{registry}/{namespace}/{name}"),
            Self::Workflow {
                source_control,
                organization,
                repository,
                ..
            } => format!("{source_control}/{organization}/{repository}"),
        }
    }

    /// Last fixed path component (`name` for tools, `repository` for
    /// workflows).
    pub fn base_name(&self) -> &str {
        match self {
            Self::Tool { name, .. } => name,
            Self::Workflow { repository, .. } => repository,
        }
    }

    /// Source-control coordinates descriptors sync from:
    /// (host, organization, repository).
    pub fn source_coordinates(&self) -> (&str, &str, &str) {
        match self {
            Self::Tool {
                source_control,
                organization,
                repository,
                ..
            }
            | Self::Workflow {
                source_control,
                organization,
                repository,
                ..
            } => (source_control, organization, repository),
        }
    }
}

/// A catalog entry: one tool or workflow with its version set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub kind: EntryKind,
    /// Optional secondary name distinguishing multiple entries at the same
    /// path ("toolname"/"workflowname")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub mode: EntryMode,
    pub descriptor_type: DescriptorType,
    pub published: bool,
    /// Name of the default version; must reference an own version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_version: Option<String>,
    /// One-to-one link to this entry's checker workflow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checker_id: Option<EntryId>,
    /// Derived from the default version's descriptor on refresh
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Configured path to the primary descriptor
    pub default_descriptor_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_test_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_dockerfile_path: Option<String>,
    /// Subjects allowed to mutate this entry
    pub owners: Vec<String>,
    /// Hosted version names that were deleted and may never be reissued
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retired_version_names: Vec<String>,
    pub versions: Vec<Version>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static pattern"))
}

/// Validate a secondary name: restricted charset, and not purely numeric
/// (which would collide with id-lookup syntax).
pub fn validate_secondary_name(name: &str) -> Result<()> {
    if !name_pattern().is_match(name) {
        return Err(CatalogError::validation(format!(
            "Invalid name '{name}': only letters, digits, '_' and '-' are allowed"
        )));
    }
    if name.chars().all(|c| c.is_ascii_digit()) {
        return Err(CatalogError::validation(format!(
            "Invalid name '{name}': purely numeric names collide with id lookup"
        )));
    }
    Ok(())
}

/// Validate a base name (repository or registry tool name). These come
/// from upstream systems with their own naming rules, so only the
/// constraints the catalog itself needs are enforced: non-empty and not
/// purely numeric.
pub fn validate_base_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CatalogError::validation("Entry name cannot be empty"));
    }
    if name.chars().all(|c| c.is_ascii_digit()) {
        return Err(CatalogError::validation(format!(
            "Invalid name '{name}': purely numeric names collide with id lookup"
        )));
    }
    Ok(())
}

impl Entry {
    /// Create an unpublished stub entry.
    pub fn new(
        kind: EntryKind,
        tool_name: Option<String>,
        descriptor_type: DescriptorType,
        default_descriptor_path: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<Self> {
        if let Some(ref name) = tool_name {
            validate_secondary_name(name)?;
        }
        validate_base_name(kind.base_name())?;
        let now = Utc::now();
        Ok(Self {
            id: EntryId::new(),
            kind,
            tool_name,
            mode: EntryMode::Stub,
            descriptor_type,
            published: false,
            default_version: None,
            checker_id: None,
            author: None,
            description: None,
            license: None,
            default_descriptor_path: default_descriptor_path.into(),
            default_test_path: None,
            default_dockerfile_path: None,
            owners: vec![owner.into()],
            retired_version_names: Vec::new(),
            versions: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn class(&self) -> EntryClass {
        self.kind.class()
    }

    /// Path with the secondary name appended when present. The (path,
    /// secondary-name) pair is unique per entry class.
    pub fn full_path(&self) -> String {
        match &self.tool_name {
            Some(name) => format!("{}/{}", self.kind.path(), name),
            None => self.kind.path(),
        }
    }

    /// Whether this workflow is the checker of another entry.
    pub fn checker_of(&self) -> Option<EntryId> {
        match &self.kind {
            EntryKind::Workflow { checker_of, .. } => *checker_of,
            EntryKind::Tool { .. } => None,
        }
    }

    pub fn is_checker(&self) -> bool {
        self.checker_of().is_some()
    }

    pub fn is_hosted(&self) -> bool {
        self.mode == EntryMode::Hosted
    }

    pub fn is_owner(&self, subject: &str) -> bool {
        self.owners.iter().any(|o| o == subject)
    }

    pub fn find_version(&self, name: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.name == name)
    }

    pub fn find_version_mut(&mut self, name: &str) -> Option<&mut Version> {
        self.versions.iter_mut().find(|v| v.name == name)
    }

    /// The default version record, when one is set.
    pub fn default_version_record(&self) -> Option<&Version> {
        self.default_version
            .as_deref()
            .and_then(|name| self.find_version(name))
    }

    /// Add a version, enforcing case-sensitive name uniqueness.
    pub fn add_version(&mut self, version: Version) -> Result<()> {
        if self.find_version(&version.name).is_some() {
            return Err(CatalogError::conflict(format!(
                "Version '{}' already exists on {}",
                version.name,
                self.full_path()
            )));
        }
        self.versions.push(version);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a version by name.
    ///
    /// Frozen versions cannot be deleted. Removing the current default
    /// atomically reassigns the default to the highest remaining version
    /// name, or clears it when none remain.
    pub fn remove_version(&mut self, name: &str) -> Result<Version> {
        let idx = self
            .versions
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| {
                CatalogError::not_found(format!(
                    "Version '{name}' not found on {}",
                    self.full_path()
                ))
            })?;
        if self.versions[idx].frozen {
            return Err(CatalogError::conflict(format!(
                "Version '{name}' is snapshotted and cannot be deleted"
            )));
        }
        let removed = self.versions.remove(idx);
        if self.default_version.as_deref() == Some(name) {
            self.default_version = highest_version_name(&self.versions);
        }
        self.retired_version_names.push(removed.name.clone());
        self.updated_at = Utc::now();
        Ok(removed)
    }

    /// Set the default version; it must name one of this entry's versions.
    pub fn set_default_version(&mut self, name: &str) -> Result<()> {
        if self.find_version(name).is_none() {
            return Err(CatalogError::not_found(format!(
                "Version '{name}' not found on {}",
                self.full_path()
            )));
        }
        self.default_version = Some(name.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReferenceType;

    fn workflow() -> Entry {
        Entry::new(
            EntryKind::Workflow {
                source_control: "github.com".to_string(),
                organization: "org".to_string(),
                repository: "repo".to_string(),
                checker_of: None,
            },
            None,
            DescriptorType::Cwl,
            "/Dockstore.cwl",
            "alice",
        )
        .unwrap()
    }

    fn hosted_version(name: &str) -> Version {
        Version::new(name, ReferenceType::Hosted, "/Dockstore.cwl")
    }

    #[test]
    fn test_secondary_name_charset() {
        assert!(validate_secondary_name("my-tool_2").is_ok());
        assert!(validate_secondary_name("bad name").is_err());
        assert!(validate_secondary_name("bad/name").is_err());
        assert!(validate_secondary_name("").is_err());
    }

    #[test]
    fn test_purely_numeric_name_rejected() {
        assert!(validate_secondary_name("12345").is_err());
        assert!(validate_secondary_name("1a2").is_ok());
        assert!(validate_base_name("12345").is_err());
        assert!(validate_base_name("").is_err());
    }

    #[test]
    fn test_base_name_keeps_upstream_charset() {
        let e = Entry::new(
            EntryKind::Workflow {
                source_control: "github.com".to_string(),
                organization: "nf-core".to_string(),
                repository: "nf-core.variants".to_string(),
                checker_of: None,
            },
            None,
            DescriptorType::Cwl,
            "/Dockstore.cwl",
            "alice",
        )
        .unwrap();
        assert_eq!(e.full_path(), "github.com/nf-core/nf-core.variants");
    }

    #[test]
    fn test_full_path() {
        let mut e = workflow();
        assert_eq!(e.full_path(), "github.com/org/repo");
        e.tool_name = Some("alt".to_string());
        assert_eq!(e.full_path(), "github.com/org/repo/alt");
    }

    #[test]
    fn test_new_entry_is_stub_without_versions() {
        let e = workflow();
        assert_eq!(e.mode, EntryMode::Stub);
        assert!(e.versions.is_empty());
        assert!(!e.published);
    }

    #[test]
    fn test_add_version_rejects_duplicate_name() {
        let mut e = workflow();
        e.add_version(hosted_version("1")).unwrap();
        let err = e.add_version(hosted_version("1")).unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));
    }

    #[test]
    fn test_version_names_case_sensitive() {
        let mut e = workflow();
        e.add_version(Version::new("Main", ReferenceType::Branch, "/a.cwl"))
            .unwrap();
        assert!(e
            .add_version(Version::new("main", ReferenceType::Branch, "/a.cwl"))
            .is_ok());
    }

    #[test]
    fn test_remove_default_reassigns_to_highest() {
        let mut e = workflow();
        for name in ["1", "2", "3"] {
            e.add_version(hosted_version(name)).unwrap();
        }
        e.set_default_version("3").unwrap();

        e.remove_version("3").unwrap();
        assert_eq!(e.default_version.as_deref(), Some("2"));
        assert_eq!(e.versions.len(), 2);

        e.remove_version("2").unwrap();
        e.remove_version("1").unwrap();
        assert_eq!(e.default_version, None);
        assert!(e.versions.is_empty());
    }

    #[test]
    fn test_remove_frozen_version_fails() {
        let mut e = workflow();
        let mut v = hosted_version("1");
        v.frozen = true;
        e.add_version(v).unwrap();
        let err = e.remove_version("1").unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));
        assert_eq!(e.versions.len(), 1);
    }

    #[test]
    fn test_removed_names_are_retired() {
        let mut e = workflow();
        e.add_version(hosted_version("3")).unwrap();
        e.remove_version("3").unwrap();
        assert_eq!(e.retired_version_names, vec!["3".to_string()]);
    }

    #[test]
    fn test_set_default_requires_existing_version() {
        let mut e = workflow();
        assert!(matches!(
            e.set_default_version("nope"),
            Err(CatalogError::NotFound(_))
        ));
    }
}

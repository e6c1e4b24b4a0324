//! Versions of a catalog entry
//!
//! A version is one revision of an entry: a git tag or branch for synced
//! entries, or a sequential integer name for hosted entries. Versions own
//! their source files and resolved images outright.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::image::{Image, ImageReference};
use crate::source_file::{FileType, SourceFile};
use crate::types::ReferenceType;

/// One revision of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Name, unique within the entry, case-sensitive
    pub name: String,
    pub reference_type: ReferenceType,
    /// Whether descriptor parsing succeeded for this revision
    pub valid: bool,
    /// User-set: hidden from public listings
    pub hidden: bool,
    /// User-set: externally verified
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_source: Option<String>,
    /// Set when the entry's configured descriptor paths no longer match
    /// the paths this version was parsed against
    pub dirty_bit: bool,
    /// Snapshot flag. Once true the version is immutable and undeletable.
    pub frozen: bool,
    /// Git commit id; absent for hosted versions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    /// The descriptor path this version was parsed against
    pub descriptor_path: String,
    pub source_files: Vec<SourceFile>,
    /// Image references as written in the descriptor/configuration; kept
    /// for snapshot-eligibility checks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_references: Vec<ImageReference>,
    pub images: Vec<Image>,
    /// Subject that produced this version through a hosted edit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Version {
    /// Create a new, empty version.
    pub fn new(name: impl Into<String>, reference_type: ReferenceType, descriptor_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference_type,
            valid: false,
            hidden: false,
            verified: false,
            verified_source: None,
            dirty_bit: false,
            frozen: false,
            commit_id: None,
            descriptor_path: descriptor_path.into(),
            source_files: Vec::new(),
            image_references: Vec::new(),
            images: Vec::new(),
            editor: None,
            created_at: Utc::now(),
        }
    }

    /// Look up a file by its path.
    pub fn find_file(&self, path: &str) -> Option<&SourceFile> {
        self.source_files.iter().find(|f| f.path == path)
    }

    /// The primary descriptor file, if this version has one.
    pub fn primary_descriptor(&self) -> Option<&SourceFile> {
        self.source_files
            .iter()
            .find(|f| f.file_type == FileType::PrimaryDescriptor)
    }

    /// All test-parameter files.
    pub fn test_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.source_files
            .iter()
            .filter(|f| f.file_type == FileType::TestParameter)
    }

    /// The Dockerfile, if present.
    pub fn containerfile(&self) -> Option<&SourceFile> {
        self.source_files
            .iter()
            .find(|f| f.file_type == FileType::Dockerfile)
    }

    /// Hosted version names are stringified integers.
    pub fn numeric_name(&self) -> Option<u64> {
        self.name.parse().ok()
    }

    /// Copy fields that are user-set rather than derived from source, so a
    /// re-sync does not clobber them.
    pub fn preserve_user_fields(&mut self, prior: &Version) {
        self.hidden = prior.hidden;
        self.verified = prior.verified;
        self.verified_source = prior.verified_source.clone();
        self.frozen = prior.frozen;
    }
}

/// Pick the version a cleared default should fall back to: the highest
/// numeric name when all names are integers (hosted entries), otherwise the
/// lexically greatest name.
pub fn highest_version_name(versions: &[Version]) -> Option<String> {
    if versions.is_empty() {
        return None;
    }
    if versions.iter().all(|v| v.numeric_name().is_some()) {
        versions
            .iter()
            .max_by_key(|v| v.numeric_name().unwrap_or(0))
            .map(|v| v.name.clone())
    } else {
        versions.iter().map(|v| v.name.clone()).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosted(name: &str) -> Version {
        Version::new(name, ReferenceType::Hosted, "/main.cwl")
    }

    #[test]
    fn test_find_file() {
        let mut v = hosted("1");
        v.source_files
            .push(SourceFile::new("/main.cwl", FileType::PrimaryDescriptor, "x").unwrap());
        assert!(v.find_file("/main.cwl").is_some());
        assert!(v.find_file("/other.cwl").is_none());
    }

    #[test]
    fn test_preserve_user_fields() {
        let mut prior = hosted("1");
        prior.hidden = true;
        prior.verified = true;
        prior.verified_source = Some("curator".to_string());

        let mut fresh = hosted("1");
        fresh.valid = true;
        fresh.preserve_user_fields(&prior);

        assert!(fresh.hidden);
        assert!(fresh.verified);
        assert_eq!(fresh.verified_source.as_deref(), Some("curator"));
        // derived fields stay fresh
        assert!(fresh.valid);
    }

    #[test]
    fn test_highest_version_name_numeric() {
        let versions = vec![hosted("1"), hosted("10"), hosted("2")];
        assert_eq!(highest_version_name(&versions).as_deref(), Some("10"));
    }

    #[test]
    fn test_highest_version_name_mixed_falls_back_to_lexical() {
        let versions = vec![
            Version::new("v1.0", ReferenceType::Tag, "/main.cwl"),
            Version::new("v1.9", ReferenceType::Tag, "/main.cwl"),
            Version::new("main", ReferenceType::Branch, "/main.cwl"),
        ];
        assert_eq!(highest_version_name(&versions).as_deref(), Some("v1.9"));
    }

    #[test]
    fn test_highest_version_name_empty() {
        assert_eq!(highest_version_name(&[]), None);
    }
}

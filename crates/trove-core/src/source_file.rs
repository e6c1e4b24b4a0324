//! Source files attached to a version
//!
//! Every version owns its own `SourceFile` records, even when content is
//! unchanged from the predecessor, so historical versions remain
//! independently inspectable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checksum::{sha256, Checksum};
use crate::error::{CatalogError, Result};

/// Role a file plays inside a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    /// The entry's main descriptor, at the configured descriptor path
    PrimaryDescriptor,
    /// Imported/included descriptor files
    SecondaryDescriptor,
    Dockerfile,
    TestParameter,
    Other,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryDescriptor => write!(f, "PRIMARY_DESCRIPTOR"),
            Self::SecondaryDescriptor => write!(f, "SECONDARY_DESCRIPTOR"),
            Self::Dockerfile => write!(f, "DOCKERFILE"),
            Self::TestParameter => write!(f, "TEST_PARAMETER"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// A path + content + checksum record owned by exactly one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Repository-relative path, always starting with `/`
    pub path: String,
    /// Absolute path within the source tree; equal to `path` unless the
    /// provider reports a different canonical location
    pub absolute_path: String,
    pub file_type: FileType,
    /// File content. May be nulled for storage reclamation after the
    /// checksum is persisted.
    pub content: Option<String>,
    /// Checksum of the content at the time the version was written
    pub checksum: Checksum,
}

impl SourceFile {
    /// Create a source file, computing its checksum from the content.
    pub fn new(path: impl Into<String>, file_type: FileType, content: impl Into<String>) -> Result<Self> {
        let path = normalize_path(path.into())?;
        let content = content.into();
        let checksum = sha256(content.as_bytes());
        Ok(Self {
            absolute_path: path.clone(),
            path,
            file_type,
            content: Some(content),
            checksum,
        })
    }

    /// Last path segment, e.g. `Dockstore.cwl` for `/wf/Dockstore.cwl`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }
}

/// Validate and normalize a source-file path.
///
/// Paths must be non-empty, must not end in `/` (no empty terminal
/// segment), and are anchored at the repository root.
pub fn normalize_path(path: String) -> Result<String> {
    if path.is_empty() || path == "/" || path.ends_with('/') {
        return Err(CatalogError::validation(format!(
            "Invalid file path '{path}': missing file name"
        )));
    }
    if path.starts_with('/') {
        Ok(path)
    } else {
        Ok(format!("/{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computes_checksum() {
        let f = SourceFile::new("/Dockstore.cwl", FileType::PrimaryDescriptor, "cwlVersion: v1.0").unwrap();
        assert_eq!(f.checksum, sha256(b"cwlVersion: v1.0"));
        assert_eq!(f.path, "/Dockstore.cwl");
    }

    #[test]
    fn test_relative_path_is_anchored() {
        let f = SourceFile::new("tools/a.wdl", FileType::SecondaryDescriptor, "x").unwrap();
        assert_eq!(f.path, "/tools/a.wdl");
    }

    #[test]
    fn test_rejects_trailing_slash() {
        assert!(SourceFile::new("/dir/", FileType::Other, "x").is_err());
        assert!(SourceFile::new("/", FileType::Other, "x").is_err());
        assert!(SourceFile::new("", FileType::Other, "x").is_err());
    }

    #[test]
    fn test_file_name() {
        let f = SourceFile::new("/nested/dir/wf.wdl", FileType::PrimaryDescriptor, "x").unwrap();
        assert_eq!(f.file_name(), "wf.wdl");
    }

    #[test]
    fn test_checksum_survives_content_null() {
        let mut f = SourceFile::new("/a.cwl", FileType::PrimaryDescriptor, "body").unwrap();
        let original = f.checksum.clone();
        f.content = None;
        assert_eq!(f.checksum, original);
    }
}

//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::CatalogError;

/// Entry identifier using ULID (stable, lexicographically sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Ulid);

impl EntryId {
    /// Generate a new EntryId
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Get the underlying ULID
    pub fn as_ulid(&self) -> &Ulid {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| CatalogError::validation(format!("Invalid entry id: {e}")))
    }
}

/// Lifecycle mode of an entry.
///
/// Stub entries carry no versions; Full entries are synchronized from
/// source control; Hosted entries are built from direct file uploads and
/// never synchronize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryMode {
    Stub,
    Full,
    Hosted,
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stub => write!(f, "STUB"),
            Self::Full => write!(f, "FULL"),
            Self::Hosted => write!(f, "HOSTED"),
        }
    }
}

/// Descriptor language of an entry's workflow or tool definition.
///
/// Parsing is delegated to an external capability; the catalog only needs
/// to tag entries and route TRS descriptor requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DescriptorType {
    Cwl,
    Wdl,
    Nextflow,
}

impl DescriptorType {
    /// TRS token for this descriptor type (`CWL`, `WDL`, `NFL`)
    pub fn trs_token(&self) -> &'static str {
        match self {
            Self::Cwl => "CWL",
            Self::Wdl => "WDL",
            Self::Nextflow => "NFL",
        }
    }
}

impl fmt::Display for DescriptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.trs_token())
    }
}

impl FromStr for DescriptorType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CWL" => Ok(Self::Cwl),
            "WDL" => Ok(Self::Wdl),
            "NFL" | "NEXTFLOW" => Ok(Self::Nextflow),
            _ => Err(CatalogError::validation(format!(
                "Invalid descriptor type: {s}"
            ))),
        }
    }
}

/// What kind of ref a version was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReferenceType {
    Branch,
    Tag,
    /// Sequentially numbered version built from uploaded files
    Hosted,
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch => write!(f, "BRANCH"),
            Self::Tag => write!(f, "TAG"),
            Self::Hosted => write!(f, "HOSTED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_generation() {
        let id1 = EntryId::new();
        let id2 = EntryId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_entry_id_round_trip() {
        let id = EntryId::new();
        let parsed: EntryId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_entry_id_rejects_garbage() {
        assert!("not-an-id".parse::<EntryId>().is_err());
    }

    #[test]
    fn test_descriptor_type_parsing() {
        assert_eq!("cwl".parse::<DescriptorType>().unwrap(), DescriptorType::Cwl);
        assert_eq!(
            "NEXTFLOW".parse::<DescriptorType>().unwrap(),
            DescriptorType::Nextflow
        );
        assert!("SMK".parse::<DescriptorType>().is_err());
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&EntryMode::Hosted).unwrap();
        assert_eq!(json, "\"HOSTED\"");
    }
}

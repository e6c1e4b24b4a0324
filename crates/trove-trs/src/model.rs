//! GA4GH Tool Registry Service wire types
//!
//! The v2 shapes follow the TRS 2.0 schema; the `v1` module holds the
//! legacy shapes still served under `/api/ga4gh/v1`.

use serde::{Deserialize, Serialize};

/// Checksum type reported on descriptor and test file wrappers.
pub const FILE_CHECKSUM_TYPE: &str = "sha-256";

/// Checksum type reported on image records. Kept separate from
/// [`FILE_CHECKSUM_TYPE`] so the two surfaces can diverge.
pub const IMAGE_CHECKSUM_TYPE: &str = "sha-256";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolClass {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl ToolClass {
    pub fn command_line_tool() -> Self {
        Self {
            id: "0".to_string(),
            name: "CommandLineTool".to_string(),
            description: "CommandLineTool".to_string(),
        }
    }

    pub fn workflow() -> Self {
        Self {
            id: "1".to_string(),
            name: "Workflow".to_string(),
            description: "Workflow".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub url: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub organization: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolname: Option<String>,
    pub toolclass: ToolClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub meta_version: String,
    pub has_checker: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checker_url: Option<String>,
    pub versions: Vec<ToolVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersion {
    pub url: String,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<String>,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verified_source: Vec<String>,
    /// True only for frozen snapshots
    pub is_production: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageData>,
    pub descriptor_type: Vec<String>,
    pub containerfile: bool,
    pub meta_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub registry_host: String,
    pub image_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checksum: Vec<TrsChecksum>,
    pub image_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrsChecksum {
    pub checksum: String,
    #[serde(rename = "type")]
    pub checksum_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWrapper {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checksum: Vec<TrsChecksum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// TRS file type tokens for `/files` listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrsFileType {
    PrimaryDescriptor,
    SecondaryDescriptor,
    TestFile,
    Containerfile,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFile {
    pub path: String,
    pub file_type: TrsFileType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub description: String,
    pub organization: ServiceOrganization,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceType {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOrganization {
    pub name: String,
    pub url: String,
}

impl ServiceInfo {
    pub fn current() -> Self {
        Self {
            id: "io.trove.trs".to_string(),
            name: "Trove".to_string(),
            service_type: ServiceType {
                group: "org.ga4gh".to_string(),
                artifact: "trs".to_string(),
                version: "2.0.0".to_string(),
            },
            description: "Tool and workflow catalog".to_string(),
            organization: ServiceOrganization {
                name: "Trove".to_string(),
                url: "https://trove.io".to_string(),
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Legacy TRS 1.0 shapes.
pub mod v1 {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Tool {
        pub url: String,
        pub id: String,
        pub organization: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub toolname: Option<String>,
        pub tooltype: ToolType,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(rename = "meta-version")]
        pub meta_version: String,
        pub versions: Vec<ToolVersion>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ToolType {
        pub id: String,
        pub name: String,
        pub description: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ToolVersion {
        pub url: String,
        pub id: String,
        pub name: String,
        #[serde(rename = "meta-version")]
        pub meta_version: String,
        pub descriptor_type: Vec<String>,
        pub dockerfile: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ToolDescriptor {
        #[serde(rename = "type")]
        pub descriptor_type: String,
        pub descriptor: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ToolDockerfile {
        pub dockerfile: String,
    }
}

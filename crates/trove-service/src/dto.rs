//! Data transfer objects for service boundaries

use serde::{Deserialize, Serialize};
use trove_core::{DescriptorType, EntryClass};

/// Manual registration of an image-registry-backed tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterToolRequest {
    /// Registry host (`quay.io`, `ghcr.io`, …)
    pub registry: String,
    pub namespace: String,
    pub name: String,
    /// Source-control host the descriptors sync from
    pub source_control: String,
    pub organization: String,
    pub repository: String,
    /// Optional secondary name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub descriptor_type: DescriptorType,
    pub descriptor_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
}

/// Manual registration of a source-control-backed workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterWorkflowRequest {
    /// Source-control host (`github.com`, `bitbucket.org`, …)
    pub source_control: String,
    pub organization: String,
    pub repository: String,
    pub descriptor_path: String,
    pub descriptor_type: DescriptorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
}

/// Creation of a hosted entry: versions come from uploads, not sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHostedRequest {
    pub class: EntryClass,
    pub descriptor_type: DescriptorType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_name: Option<String>,
}

/// One element of a hosted edit: non-null content adds or replaces the
/// file, null content deletes it, absent files carry over unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePatch {
    pub path: String,
    pub content: Option<String>,
}

impl FilePatch {
    pub fn put(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
        }
    }
}

/// Outcome of a bulk refresh: per-entry failures are collected, never
/// thrown, so one bad entry cannot abort the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Full paths of entries refreshed successfully
    pub refreshed: Vec<String>,
    /// (full path, error message) for entries whose refresh failed
    pub failures: Vec<(String, String)>,
}

impl RefreshReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_patch_constructors() {
        assert!(FilePatch::put("/a", "x").content.is_some());
        assert!(FilePatch::delete("/a").content.is_none());
    }

    #[test]
    fn test_refresh_report_clean() {
        let mut report = RefreshReport::default();
        assert!(report.is_clean());
        report.failures.push(("p".to_string(), "boom".to_string()));
        assert!(!report.is_clean());
    }
}

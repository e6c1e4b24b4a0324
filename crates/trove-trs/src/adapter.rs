//! Projection of catalog entries into TRS wire shapes
//!
//! Ids and version names are percent-encoded wherever they appear in a
//! self-link. File paths in TRS responses are relative to the primary
//! descriptor's directory, using `..` segments when a file sits outside
//! it.

use trove_core::{Entry, EntryClass, EntryKind, FileType, SourceFile, Version};

use crate::model::{
    self, FileWrapper, ImageData, Tool, ToolClass, ToolFile, ToolVersion, TrsChecksum,
    TrsFileType,
};

/// Percent-encode one path segment per RFC 3986: everything except
/// unreserved characters is escaped.
pub fn percent_encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// The TRS id of an entry. Workflows carry the `#workflow/` prefix; tools
/// use their registry path directly.
pub fn trs_id(entry: &Entry) -> String {
    match &entry.kind {
        EntryKind::Tool { .. } => entry.full_path(),
        EntryKind::Workflow { .. } => format!("#workflow/{}", entry.full_path()),
    }
}

/// A TRS id encoded for use as one URL path segment.
pub fn encoded_id(entry: &Entry) -> String {
    percent_encode(&trs_id(entry))
}

/// Compute `target`'s path relative to the directory holding `primary`.
/// Both are absolute catalog paths.
pub fn relative_to_primary(primary: &str, target: &str) -> String {
    let primary_dirs: Vec<&str> = primary
        .trim_start_matches('/')
        .split('/')
        .collect::<Vec<_>>()
        .split_last()
        .map(|(_, dirs)| dirs.to_vec())
        .unwrap_or_default();
    let target_parts: Vec<&str> = target.trim_start_matches('/').split('/').collect();
    let (target_file, target_dirs) = match target_parts.split_last() {
        Some((file, dirs)) => (*file, dirs),
        None => return target.trim_start_matches('/').to_string(),
    };

    let common = primary_dirs
        .iter()
        .zip(target_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<&str> = Vec::new();
    for _ in common..primary_dirs.len() {
        segments.push("..");
    }
    segments.extend(&target_dirs[common..]);
    segments.push(target_file);
    segments.join("/")
}

fn trs_file_type(file_type: FileType) -> TrsFileType {
    match file_type {
        FileType::PrimaryDescriptor => TrsFileType::PrimaryDescriptor,
        FileType::SecondaryDescriptor => TrsFileType::SecondaryDescriptor,
        FileType::TestParameter => TrsFileType::TestFile,
        FileType::Dockerfile => TrsFileType::Containerfile,
        FileType::Other => TrsFileType::Other,
    }
}

pub fn file_wrapper(file: &SourceFile) -> FileWrapper {
    FileWrapper {
        content: file.content.clone(),
        checksum: vec![TrsChecksum {
            checksum: file.checksum.value.clone(),
            checksum_type: model::FILE_CHECKSUM_TYPE.to_string(),
        }],
        url: None,
    }
}

/// The `/files` listing for a version, paths relative to the primary
/// descriptor.
pub fn tool_files(version: &Version) -> Vec<ToolFile> {
    let primary = version
        .primary_descriptor()
        .map(|f| f.path.clone())
        .unwrap_or_else(|| version.descriptor_path.clone());
    version
        .source_files
        .iter()
        .map(|file| ToolFile {
            path: relative_to_primary(&primary, &file.path),
            file_type: trs_file_type(file.file_type),
        })
        .collect()
}

pub fn tool_version(base_url: &str, entry: &Entry, version: &Version) -> ToolVersion {
    let url = format!(
        "{base_url}/tools/{}/versions/{}",
        encoded_id(entry),
        percent_encode(&version.name)
    );
    // only snapshots expose concrete images; everything else is still
    // floating and would mislead reproducibility tooling
    let images = if version.frozen {
        version.images.iter().map(image_data).collect()
    } else {
        Vec::new()
    };
    ToolVersion {
        url,
        id: version.name.clone(),
        name: version.name.clone(),
        author: entry.author.clone().into_iter().collect(),
        verified: version.verified,
        verified_source: version.verified_source.clone().into_iter().collect(),
        is_production: version.frozen,
        images,
        descriptor_type: vec![entry.descriptor_type.trs_token().to_string()],
        containerfile: version.containerfile().is_some(),
        meta_version: entry.updated_at.to_rfc3339(),
    }
}

fn image_data(image: &trove_core::Image) -> ImageData {
    let image_name = match &image.tag {
        Some(tag) => format!("{}:{tag}", image.repository),
        None => image.repository.clone(),
    };
    ImageData {
        registry_host: image.registry.clone(),
        image_name,
        size: image.size,
        checksum: image
            .checksums
            .iter()
            .map(|c| TrsChecksum {
                checksum: c.value.clone(),
                checksum_type: model::IMAGE_CHECKSUM_TYPE.to_string(),
            })
            .collect(),
        image_type: "Docker".to_string(),
    }
}

/// Project a published entry into a TRS tool. `checker` is the resolved
/// checker entry when one is attached.
pub fn tool(base_url: &str, entry: &Entry, checker: Option<&Entry>) -> Tool {
    let toolclass = match entry.class() {
        EntryClass::Tool => ToolClass::command_line_tool(),
        EntryClass::Workflow => ToolClass::workflow(),
    };
    let versions = entry
        .versions
        .iter()
        .filter(|v| !v.hidden)
        .map(|v| tool_version(base_url, entry, v))
        .collect();
    let (_, organization, _) = entry.kind.source_coordinates();
    Tool {
        url: format!("{base_url}/tools/{}", encoded_id(entry)),
        id: trs_id(entry),
        aliases: Vec::new(),
        organization: organization.to_string(),
        name: entry.kind.base_name().to_string(),
        toolname: entry.tool_name.clone(),
        toolclass,
        description: entry.description.clone(),
        meta_version: entry.updated_at.to_rfc3339(),
        has_checker: entry.checker_id.is_some(),
        checker_url: checker.map(|c| format!("{base_url}/tools/{}", encoded_id(c))),
        versions,
    }
}

/// Legacy v1 projection.
pub fn tool_v1(base_url: &str, entry: &Entry) -> model::v1::Tool {
    let toolclass = match entry.class() {
        EntryClass::Tool => ToolClass::command_line_tool(),
        EntryClass::Workflow => ToolClass::workflow(),
    };
    let url = format!("{base_url}/tools/{}", encoded_id(entry));
    let versions = entry
        .versions
        .iter()
        .filter(|v| !v.hidden)
        .map(|v| model::v1::ToolVersion {
            url: format!("{url}/versions/{}", percent_encode(&v.name)),
            id: v.name.clone(),
            name: v.name.clone(),
            meta_version: entry.updated_at.to_rfc3339(),
            descriptor_type: vec![entry.descriptor_type.trs_token().to_string()],
            dockerfile: v.containerfile().is_some(),
        })
        .collect();
    model::v1::Tool {
        url,
        id: trs_id(entry),
        organization: entry.kind.source_coordinates().1.to_string(),
        toolname: entry.tool_name.clone(),
        tooltype: model::v1::ToolType {
            id: toolclass.id,
            name: toolclass.name,
            description: toolclass.description,
        },
        description: entry.description.clone(),
        meta_version: entry.updated_at.to_rfc3339(),
        versions,
    }
}

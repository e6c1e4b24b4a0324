//! Zip export of a version's files
//!
//! Archive entries are the version's catalog paths with the leading `/`
//! stripped, so the primary descriptor of `/wf/main.cwl` lands at
//! `wf/main.cwl` inside the archive.

use std::io::{Cursor, Write};
use trove_core::Version;
use zip::{write::FileOptions, ZipWriter};

use crate::error::{ApiError, ApiResult};

pub fn archive_version(version: &Version) -> ApiResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for file in &version.source_files {
        let name = file.path.trim_start_matches('/');
        writer
            .start_file(name, options)
            .map_err(|e| ApiError::internal(format!("Zip write failed: {e}")))?;
        if let Some(content) = &file.content {
            writer
                .write_all(content.as_bytes())
                .map_err(|e| ApiError::internal(format!("Zip write failed: {e}")))?;
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| ApiError::internal(format!("Zip write failed: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use trove_core::{FileType, ReferenceType, SourceFile};

    #[test]
    fn test_archive_strips_leading_slash() {
        let mut version = Version::new("1", ReferenceType::Hosted, "/wf/main.cwl");
        version.source_files.push(
            SourceFile::new("/wf/main.cwl", FileType::PrimaryDescriptor, "cwlVersion: v1.2")
                .unwrap(),
        );
        version
            .source_files
            .push(SourceFile::new("/test.json", FileType::TestParameter, "{}").unwrap());

        let bytes = archive_version(&version).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["wf/main.cwl", "test.json"]);

        let mut content = String::new();
        archive
            .by_name("wf/main.cwl")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "cwlVersion: v1.2");
    }
}

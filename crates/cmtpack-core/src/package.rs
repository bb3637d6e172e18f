//! Import package (ZIP) creation
//!
//! A package holds exactly three entries, in this order: the data document,
//! the schema file under its own file name and the fixed
//! `[Content_Types].xml` manifest.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::{Error, Result};

/// Archive entry name of the content-types manifest
pub const CONTENT_TYPES_ENTRY: &str = "[Content_Types].xml";

/// Content-types manifest shipped with every package
pub const CONTENT_TYPES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="xml" ContentType="application/octet-stream" />"#,
    r#"</Types>"#
);

/// Written package details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    /// Archive path
    pub path: PathBuf,

    /// Archive size in bytes
    pub size: u64,

    /// Hex SHA-256 digest of the archive
    pub sha256: String,

    /// Entry names in archive order
    pub entries: Vec<String>,
}

/// Write the three package entries into `writer`
pub fn write_package<W: Write + Seek>(
    writer: W,
    data_name: &str,
    data: &[u8],
    schema_name: &str,
    schema: &[u8],
) -> Result<W> {
    let mut zip = zip::ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in [
        (data_name, data),
        (schema_name, schema),
        (CONTENT_TYPES_ENTRY, CONTENT_TYPES_XML.as_bytes()),
    ] {
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
    }

    Ok(zip.finish()?)
}

/// Package a generated data file and the project schema at `archive`.
///
/// The data entry is named `data_name`; the schema keeps its file name.
pub fn create_package(
    archive: &Path,
    data_name: &str,
    data_path: &Path,
    schema_path: &Path,
) -> Result<PackageSummary> {
    let schema_name = schema_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::ConfigInvalid {
            message: format!("schema path has no file name: {}", schema_path.display()),
        })?;

    let data = fs::read(data_path)?;
    let schema = fs::read(schema_path)?;

    let cursor = write_package(
        Cursor::new(Vec::new()),
        data_name,
        &data,
        schema_name,
        &schema,
    )?;
    let bytes = cursor.into_inner();

    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(archive, &bytes)?;

    let summary = PackageSummary {
        path: archive.to_path_buf(),
        size: bytes.len() as u64,
        sha256: hex::encode(Sha256::digest(&bytes)),
        entries: vec![
            data_name.to_string(),
            schema_name.to_string(),
            CONTENT_TYPES_ENTRY.to_string(),
        ],
    };
    tracing::info!(
        "Created package {} ({} bytes, sha256 {})",
        summary.path.display(),
        summary.size,
        summary.sha256
    );
    Ok(summary)
}

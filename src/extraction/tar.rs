use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::shared::{extraction_failed, is_system_file, sanitize_entry_name};

/// Archive extractor for TAR and gzip-compressed TAR files
pub struct TarExtractor;

impl TarExtractor {
    /// Extract an uncompressed TAR archive into `dest_path`
    pub fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        let file = Self::open(archive_path)?;
        Self::unpack(tar::Archive::new(file), archive_path, dest_path, "TAR")
    }

    /// Extract a `.tar.gz` / `.tgz` archive into `dest_path`
    pub fn extract_gz(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        let file = Self::open(archive_path)?;
        Self::unpack(
            tar::Archive::new(GzDecoder::new(file)),
            archive_path,
            dest_path,
            "TAR.GZ",
        )
    }

    fn open(archive_path: &Path) -> Result<std::fs::File> {
        std::fs::File::open(archive_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to open TAR archive: {}",
                e
            )))
        })
    }

    /// Walk the entries in stream order, checking each name before writing it
    fn unpack<R: Read>(
        mut archive: tar::Archive<R>,
        archive_path: &Path,
        dest_path: &Path,
        format_name: &str,
    ) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting {} extraction", format_name);

        std::fs::create_dir_all(dest_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to create destination: {}",
                e
            )))
        })?;

        let entries = archive.entries().map_err(|e| {
            extraction_failed(archive_path, format!("failed to read {} archive: {}", format_name, e))
        })?;

        let mut extracted_files = Vec::new();

        for entry in entries {
            let mut entry = entry.map_err(|e| {
                extraction_failed(archive_path, format!("failed to read {} entry: {}", format_name, e))
            })?;

            let name = String::from_utf8_lossy(&entry.path_bytes()).to_string();
            let Some(relative) = sanitize_entry_name(archive_path, &name)? else {
                continue;
            };

            let entry_type = entry.header().entry_type();
            if entry_type.is_symlink() || entry_type.is_hard_link() {
                warn!(?archive_path, entry = %name, "skipping link entry");
                continue;
            }

            if is_system_file(&relative) {
                debug!(entry = %name, "skipping system file");
                continue;
            }

            let target = dest_path.join(&relative);

            if entry_type.is_dir() {
                std::fs::create_dir_all(&target).map_err(|e| {
                    Error::Io(std::io::Error::other(format!(
                        "failed to create directory: {}",
                        e
                    )))
                })?;
                continue;
            }

            if !entry_type.is_file() {
                debug!(entry = %name, ?entry_type, "skipping special entry");
                continue;
            }

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Io(std::io::Error::other(format!(
                        "failed to create parent directories: {}",
                        e
                    )))
                })?;
            }

            let mut outfile = std::fs::File::create(&target).map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "failed to create output file: {}",
                    e
                )))
            })?;

            std::io::copy(&mut entry, &mut outfile).map_err(|e| {
                extraction_failed(archive_path, format!("failed to extract {}: {}", name, e))
            })?;

            extracted_files.push(target);
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "{} extraction successful",
            format_name
        );

        Ok(extracted_files)
    }
}

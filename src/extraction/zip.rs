use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::shared::{extraction_failed, is_system_file, sanitize_entry_name};

/// Unix file type bits for a symbolic link
const S_IFLNK: u32 = 0o120000;
const S_IFMT: u32 = 0o170000;

/// Archive extractor for ZIP files
pub struct ZipExtractor;

impl ZipExtractor {
    /// Extract a ZIP archive into `dest_path`
    ///
    /// Every entry name is checked before anything is written, so an archive
    /// with a single unsafe entry leaves the destination untouched. Files are
    /// returned in central directory order.
    pub fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting ZIP extraction");

        let file = std::fs::File::open(archive_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to open ZIP archive: {}",
                e
            )))
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            extraction_failed(archive_path, format!("failed to read ZIP archive: {}", e))
        })?;

        let plan = Self::scan_entries(&mut archive, archive_path)?;

        std::fs::create_dir_all(dest_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to create destination: {}",
                e
            )))
        })?;

        let mut extracted_files = Vec::new();

        for (index, relative) in plan {
            let mut entry = archive.by_index(index).map_err(|e| {
                extraction_failed(archive_path, format!("failed to read ZIP entry: {}", e))
            })?;
            let target = dest_path.join(&relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&target).map_err(|e| {
                    Error::Io(std::io::Error::other(format!(
                        "failed to create directory: {}",
                        e
                    )))
                })?;
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
                extraction_failed(archive_path, format!("failed to extract {}: {}", relative.display(), e))
            })?;

            extracted_files.push(target);
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }

    /// Validate every entry and decide which ones to write
    ///
    /// Returns `(index, relative path)` pairs in central directory order.
    fn scan_entries(
        archive: &mut zip::ZipArchive<std::fs::File>,
        archive_path: &Path,
    ) -> Result<Vec<(usize, PathBuf)>> {
        let mut plan = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index).map_err(|e| {
                extraction_failed(archive_path, format!("failed to read ZIP entry: {}", e))
            })?;
            let name = entry.name().to_string();

            let Some(relative) = sanitize_entry_name(archive_path, &name)? else {
                continue;
            };

            if entry
                .unix_mode()
                .map(|mode| mode & S_IFMT == S_IFLNK)
                .unwrap_or(false)
            {
                warn!(?archive_path, entry = %name, "skipping symlink entry");
                continue;
            }

            if is_system_file(&relative) {
                debug!(entry = %name, "skipping system file");
                continue;
            }

            plan.push((index, relative));
        }

        Ok(plan)
    }
}

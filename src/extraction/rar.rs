use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::shared::{extraction_failed, is_system_file, sanitize_entry_name};

/// Archive extractor for RAR files
pub struct RarExtractor;

impl RarExtractor {
    /// Extract a RAR archive into `dest_path`
    ///
    /// The archive is listed first and every entry name validated, so an
    /// archive with a single unsafe entry leaves the destination untouched.
    /// Files are returned in archive order.
    pub fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting RAR extraction");

        let plan = Self::scan_entries(archive_path)?;

        std::fs::create_dir_all(dest_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to create destination: {}",
                e
            )))
        })?;

        let processor = unrar::Archive::new(archive_path)
            .open_for_processing()
            .map_err(|e| Self::convert_unrar_error(e, archive_path))?;

        let mut extracted_files = Vec::new();
        let mut planned = plan.into_iter();

        // Process each entry using the state machine interface
        let mut at_header = processor;
        loop {
            let at_file = match at_header.read_header() {
                Ok(Some(entry_processor)) => entry_processor,
                Ok(None) => break,
                Err(e) => return Err(Self::convert_unrar_error(e, archive_path)),
            };

            // Listing and processing visit entries in the same order
            let is_directory = at_file.entry().is_directory();
            let relative = planned.next().flatten();

            let Some(relative) = relative.filter(|_| !is_directory) else {
                at_header = at_file.skip().map_err(|e| {
                    extraction_failed(archive_path, format!("failed to skip entry: {}", e))
                })?;
                continue;
            };

            let target = dest_path.join(&relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Io(std::io::Error::other(format!(
                        "failed to create parent directories: {}",
                        e
                    )))
                })?;
            }

            at_header = at_file
                .extract_to(&target)
                .map_err(|e| Self::convert_unrar_error(e, archive_path))?;
            extracted_files.push(target);
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "RAR extraction successful"
        );

        Ok(extracted_files)
    }

    /// Validate every entry name
    ///
    /// Returns one slot per entry in archive order: the relative target for
    /// entries to write, `None` for entries to skip.
    fn scan_entries(archive_path: &Path) -> Result<Vec<Option<PathBuf>>> {
        let listing = unrar::Archive::new(archive_path)
            .open_for_listing()
            .map_err(|e| Self::convert_unrar_error(e, archive_path))?;

        let mut plan = Vec::new();
        for header in listing {
            let header = header.map_err(|e| Self::convert_unrar_error(e, archive_path))?;
            let name = Path::new(&header.filename).to_string_lossy().to_string();

            let relative = sanitize_entry_name(archive_path, &name)?;
            let relative = match relative {
                Some(relative) if is_system_file(&relative) => {
                    debug!(entry = %name, "skipping system file");
                    None
                }
                other => other,
            };
            plan.push(relative);
        }

        Ok(plan)
    }

    fn convert_unrar_error(e: unrar::error::UnrarError, archive_path: &Path) -> Error {
        extraction_failed(archive_path, format!("failed to read RAR archive: {}", e))
    }
}

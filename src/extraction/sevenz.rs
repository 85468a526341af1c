use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::shared::{extraction_failed, is_system_file, sanitize_entry_name};

/// Archive extractor for 7z files
pub struct SevenZipExtractor;

impl SevenZipExtractor {
    /// Extract a 7z archive into `dest_path`
    ///
    /// Entries are visited in archive order and each name is validated before
    /// its content is written. The first unsafe name stops extraction.
    pub fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting 7z extraction");

        std::fs::create_dir_all(dest_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to create destination: {}",
                e
            )))
        })?;

        let mut extracted_files = Vec::new();
        // Errors raised inside the callback; sevenz-rust only sees "stop"
        let mut failure: Option<Error> = None;

        let result = sevenz_rust::decompress_file_with_extract_fn(
            archive_path,
            dest_path,
            |entry, reader, _default_path| {
                let name = entry.name().to_string();
                let relative = match sanitize_entry_name(archive_path, &name) {
                    Ok(Some(relative)) => relative,
                    Ok(None) => return Ok(skip(reader, archive_path, &name, &mut failure)),
                    Err(e) => {
                        failure = Some(e);
                        return Ok(false);
                    }
                };

                if is_system_file(&relative) {
                    debug!(entry = %name, "skipping system file");
                    return Ok(skip(reader, archive_path, &name, &mut failure));
                }

                let target = dest_path.join(&relative);

                if entry.is_directory() {
                    if let Err(e) = std::fs::create_dir_all(&target) {
                        failure = Some(Error::Io(e));
                        return Ok(false);
                    }
                    return Ok(true);
                }

                let written = target
                    .parent()
                    .map(std::fs::create_dir_all)
                    .unwrap_or(Ok(()))
                    .and_then(|_| std::fs::File::create(&target))
                    .and_then(|mut outfile| std::io::copy(reader, &mut outfile));

                match written {
                    Ok(_) => {
                        extracted_files.push(target);
                        Ok(true)
                    }
                    Err(e) => {
                        failure = Some(extraction_failed(
                            archive_path,
                            format!("failed to extract {}: {}", name, e),
                        ));
                        Ok(false)
                    }
                }
            },
        );

        if let Some(e) = failure {
            return Err(e);
        }

        result.map_err(|e| {
            extraction_failed(archive_path, format!("failed to extract 7z archive: {}", e))
        })?;

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "7z extraction successful"
        );

        Ok(extracted_files)
    }
}

/// Drain an entry that is not written so the decoder stays aligned
///
/// Returns `false` (stop) after recording the failure when the entry cannot
/// be read.
fn skip(
    reader: &mut dyn std::io::Read,
    archive_path: &Path,
    name: &str,
    failure: &mut Option<Error>,
) -> bool {
    match std::io::copy(reader, &mut std::io::sink()) {
        Ok(_) => true,
        Err(e) => {
            *failure = Some(extraction_failed(
                archive_path,
                format!("failed to read skipped entry {}: {}", name, e),
            ));
            false
        }
    }
}

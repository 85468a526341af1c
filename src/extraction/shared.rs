use crate::config::ExtractionConfig;
use crate::error::{Error, PipelineError, Result};
use crate::types::ArchiveType;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Names that archivers add for their own bookkeeping
const SYSTEM_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Offset of the `ustar` magic inside a tar header block
const TAR_MAGIC_OFFSET: usize = 257;

/// Build an `ExtractionFailed` error for `archive`
pub(crate) fn extraction_failed(archive: &Path, reason: impl Into<String>) -> Error {
    Error::Pipeline(PipelineError::ExtractionFailed {
        archive: archive.to_path_buf(),
        reason: reason.into(),
    })
}

/// Validate an archive entry name and resolve it relative to the destination
///
/// Backslashes are treated as separators. Absolute names and any `..`
/// component are rejected with `UnsafeArchiveEntry`. Returns `None` for
/// entries that resolve to nothing (e.g. `./`).
pub fn sanitize_entry_name(archive: &Path, raw: &str) -> Result<Option<PathBuf>> {
    let normalized = raw.replace('\\', "/");
    let unsafe_entry = || {
        Err(Error::Pipeline(PipelineError::UnsafeArchiveEntry {
            archive: archive.to_path_buf(),
            entry: raw.to_string(),
        }))
    };

    if normalized.starts_with('/') || has_drive_prefix(&normalized) {
        return unsafe_entry();
    }

    let mut relative = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return unsafe_entry();
            }
        }
    }

    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}

/// Windows drive prefix (`C:`), absolute regardless of host
fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Whether a (sanitized) entry is archiver metadata that should not be extracted
pub fn is_system_file(relative: &Path) -> bool {
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        let Component::Normal(part) = component else {
            continue;
        };
        let part = part.to_string_lossy();
        if part == "__MACOSX" {
            return true;
        }
        if components.peek().is_none() {
            return part.starts_with("._") || SYSTEM_FILE_NAMES.contains(&part.as_ref());
        }
    }
    false
}

/// Detect the archive type of a file
///
/// Looks at the leading magic bytes first and falls back to the file extension.
pub fn detect_archive_type(path: &Path) -> Option<ArchiveType> {
    sniff_archive_type(path).or_else(|| archive_type_from_extension(path))
}

fn sniff_archive_type(path: &Path) -> Option<ArchiveType> {
    let mut header = [0u8; 512];
    let mut file = std::fs::File::open(path).ok()?;
    let mut filled = 0;
    while filled < header.len() {
        match file.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(_) => return None,
        }
    }
    let header = &header[..filled];

    if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
        Some(ArchiveType::Zip)
    } else if header.starts_with(&[0x1f, 0x8b]) {
        Some(ArchiveType::TarGz)
    } else if header.starts_with(&[b'7', b'z', 0xbc, 0xaf, 0x27, 0x1c]) {
        Some(ArchiveType::SevenZip)
    } else if header.starts_with(b"Rar!\x1a\x07") {
        Some(ArchiveType::Rar)
    } else if header.len() >= TAR_MAGIC_OFFSET + 5
        && &header[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5] == b"ustar"
    {
        Some(ArchiveType::Tar)
    } else {
        None
    }
}

fn archive_type_from_extension(path: &Path) -> Option<ArchiveType> {
    let name = path.file_name()?.to_str()?.to_lowercase();

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        return Some(ArchiveType::TarGz);
    }

    match path.extension()?.to_str()?.to_lowercase().as_str() {
        "zip" => Some(ArchiveType::Zip),
        "tar" => Some(ArchiveType::Tar),
        "7z" => Some(ArchiveType::SevenZip),
        "rar" => Some(ArchiveType::Rar),
        _ => None,
    }
}

/// Check if a file is an archive based on its extension
///
/// Uses the configured list of archive extensions to decide whether a file
/// found inside an archive should be unpacked as a nested archive.
pub fn is_archive(path: &Path, archive_extensions: &[String]) -> bool {
    if let Some(ext) = path.extension() {
        let ext_str = ext.to_string_lossy().to_lowercase();
        archive_extensions
            .iter()
            .any(|ae| ae.to_lowercase() == ext_str)
    } else {
        false
    }
}

/// Directory a nested archive is unpacked into: `<file name>_extracted` next to it
pub fn nested_destination(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "archive".to_string());
    archive.with_file_name(format!("{}_extracted", name))
}

/// Extract archives recursively to handle nested archives
///
/// Extracts `archive_path` into `dest_path`, then unpacks every extracted file
/// that looks like an archive into a sibling `<name>_extracted/` directory, up
/// to `config.max_recursion_depth`. A nested archive is replaced in the
/// returned list by its own contents, so the list stays in archive entry order.
///
/// A nested archive that fails to extract is logged and left in place, except
/// that an unsafe entry anywhere fails the whole extraction.
pub fn extract_recursive<'a>(
    archive_path: &'a Path,
    dest_path: &'a Path,
    config: &'a ExtractionConfig,
    current_depth: u32,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<PathBuf>>> + Send + 'a>> {
    Box::pin(async move {
        debug!(
            ?archive_path,
            current_depth,
            max_depth = config.max_recursion_depth,
            "extracting archive (depth {}/{})",
            current_depth,
            config.max_recursion_depth
        );

        let extracted = crate::extraction::extract_archive(archive_path, dest_path).await?;

        if current_depth >= config.max_recursion_depth {
            debug!(
                current_depth,
                max_depth = config.max_recursion_depth,
                "reached maximum recursion depth, not extracting nested archives"
            );
            return Ok(extracted);
        }

        let mut all_files = Vec::with_capacity(extracted.len());

        for file in extracted {
            if !is_archive(&file, &config.archive_extensions) {
                all_files.push(file);
                continue;
            }

            info!(?file, current_depth, "found nested archive, extracting recursively");

            let nested_dest = nested_destination(&file);
            match extract_recursive(&file, &nested_dest, config, current_depth + 1).await {
                Ok(nested_files) => {
                    debug!(
                        ?file,
                        nested_count = nested_files.len(),
                        "extracted {} files from nested archive",
                        nested_files.len()
                    );
                    if let Err(e) = std::fs::remove_file(&file) {
                        warn!(?file, error = %e, "failed to remove nested archive");
                    }
                    all_files.extend(nested_files);
                }
                Err(e @ Error::Pipeline(PipelineError::UnsafeArchiveEntry { .. })) => {
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        ?file,
                        error = %e,
                        "failed to extract nested archive, continuing with other files"
                    );
                    let _ = std::fs::remove_dir_all(&nested_dest);
                    all_files.push(file);
                }
            }
        }

        info!(
            ?archive_path,
            total_files = all_files.len(),
            depth = current_depth,
            "completed extraction with {} total files (including nested) at depth {}",
            all_files.len(),
            current_depth
        );

        Ok(all_files)
    })
}

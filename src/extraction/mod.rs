//! Archive extraction
//!
//! This module unpacks ZIP, TAR, TAR.GZ, 7z and RAR archives into a task workspace.
//! Every entry name is validated against path traversal before it is written,
//! archiver metadata (`__MACOSX/`, `._*`, `.DS_Store`) is dropped, and nested
//! archives are unpacked in place up to a configured depth.

mod rar;
mod sevenz;
mod shared;
mod tar;
mod zip;


// Re-exports
pub use rar::RarExtractor;
pub use sevenz::SevenZipExtractor;
pub use shared::{
    detect_archive_type, extract_recursive, is_archive, is_system_file, nested_destination,
    sanitize_entry_name,
};
pub use tar::TarExtractor;
pub use zip::ZipExtractor;

use crate::error::Result;
use crate::types::ArchiveType;
use shared::extraction_failed;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::info;

/// Unified archive extraction dispatcher
///
/// Detects the archive type and routes to the matching extractor on the
/// blocking thread pool.
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Extracted files in archive entry order
/// * `Err(Error)` - Unknown type, corrupt archive or unsafe entry
///
/// # Example
/// ```no_run
/// use doc_extractor::extraction::extract_archive;
/// use std::path::PathBuf;
///
/// # async fn example() -> doc_extractor::error::Result<()> {
/// let files = extract_archive(
///     &PathBuf::from("scratch/task/archive.zip"),
///     &PathBuf::from("scratch/task/extracted"),
/// ).await?;
/// println!("Extracted {} files", files.len());
/// # Ok(())
/// # }
/// ```
pub async fn extract_archive(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
    let archive_owned = archive_path.to_path_buf();
    let archive_type = spawn_blocking(move || detect_archive_type(&archive_owned))
        .await
        .ok()
        .flatten()
        .ok_or_else(|| {
            extraction_failed(
                archive_path,
                format!("unknown archive type for file: {}", archive_path.display()),
            )
        })?;

    info!(
        ?archive_path,
        ?archive_type,
        "dispatching extraction to appropriate extractor"
    );

    let archive_owned = archive_path.to_path_buf();
    let dest_owned = dest_path.to_path_buf();

    spawn_blocking(move || match archive_type {
        ArchiveType::Zip => ZipExtractor::extract(&archive_owned, &dest_owned),
        ArchiveType::Tar => TarExtractor::extract(&archive_owned, &dest_owned),
        ArchiveType::TarGz => TarExtractor::extract_gz(&archive_owned, &dest_owned),
        ArchiveType::SevenZip => SevenZipExtractor::extract(&archive_owned, &dest_owned),
        ArchiveType::Rar => RarExtractor::extract(&archive_owned, &dest_owned),
    })
    .await
    .map_err(|e| extraction_failed(archive_path, format!("extraction task panicked: {}", e)))?
}

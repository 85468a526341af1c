//! Document conversion
//!
//! Turns the files extracted from an archive into a single artifact: a merged
//! PDF or a concatenated plain-text file. [`Converter`] is the extension point;
//! [`BuiltinConverter`] handles PDFs, plain text, Word (`.docx`) documents and,
//! in PDF mode, images. Everything else is skipped.

mod pdf;
mod text;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::ConversionConfig;
use crate::error::{Error, PipelineError, Result};
use crate::types::OutputMode;
use async_trait::async_trait;
use pdf::PdfBuilder;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Extensions read as plain text
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "csv", "log", "json", "xml", "html", "htm", "rst", "ini", "yaml", "yml",
];

/// Extensions embedded as image pages in PDF mode
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

/// Outcome of a successful conversion
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    /// Where the artifact was written
    pub output_path: PathBuf,
    /// Source files that contributed content
    pub converted: usize,
    /// Source files that were unsupported, unreadable or empty
    pub skipped: usize,
}

/// Trait for turning extracted files into one artifact
///
/// Implementations receive the extraction root (for naming sections), the
/// files in extraction order, and the exact path the artifact must be written
/// to. They must write nothing else outside the workspace.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Produce the artifact for `mode` at `output_path`
    ///
    /// # Errors
    ///
    /// `NoConvertibleContent` when no file contributed anything, and
    /// `ConversionFailed` when the artifact cannot be written.
    async fn convert(
        &self,
        mode: OutputMode,
        root: &Path,
        files: &[PathBuf],
        output_path: &Path,
    ) -> Result<ConversionReport>;

    /// Name of this converter (for logging)
    fn name(&self) -> &str;
}

/// How a source file is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// PDF document
    Pdf,
    /// Plain text in any of the recognised extensions
    Text,
    /// Word 2007+ document
    Docx,
    /// Raster image; one page in PDF mode, skipped in text mode
    Image,
    /// Anything else; skipped
    Unsupported,
}

impl SourceKind {
    /// Classify a file by its extension
    pub fn classify(path: &Path) -> Self {
        let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
            return SourceKind::Unsupported;
        };

        match ext.as_str() {
            "pdf" => SourceKind::Pdf,
            "docx" => SourceKind::Docx,
            e if TEXT_EXTENSIONS.contains(&e) => SourceKind::Text,
            e if IMAGE_EXTENSIONS.contains(&e) => SourceKind::Image,
            _ => SourceKind::Unsupported,
        }
    }
}

/// Built-in converter backed by `lopdf` and `pdf-extract`
#[derive(Debug, Clone, Default)]
pub struct BuiltinConverter {
    layout: ConversionConfig,
}

impl BuiltinConverter {
    /// Create a converter with the given page layout
    pub fn new(layout: ConversionConfig) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl Converter for BuiltinConverter {
    async fn convert(
        &self,
        mode: OutputMode,
        root: &Path,
        files: &[PathBuf],
        output_path: &Path,
    ) -> Result<ConversionReport> {
        let layout = self.layout.clone();
        let root = root.to_path_buf();
        let files = files.to_vec();
        let output = output_path.to_path_buf();

        spawn_blocking(move || match mode {
            OutputMode::Pdf => convert_to_pdf(layout, &root, &files, &output),
            OutputMode::Txt => convert_to_text(&root, &files, &output),
        })
        .await
        .map_err(|e| conversion_failed(format!("conversion task panicked: {}", e)))?
    }

    fn name(&self) -> &str {
        "builtin"
    }
}

/// Section label for a file: its path relative to the extraction root
pub fn section_label(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn conversion_failed(reason: impl Into<String>) -> Error {
    Error::Pipeline(PipelineError::ConversionFailed {
        reason: reason.into(),
    })
}

/// Text content of a non-PDF source, or `None` when it is skipped
fn read_source_text(kind: SourceKind, file: &Path) -> Option<String> {
    let result = match kind {
        SourceKind::Text => text::read_text_lossy(file).map_err(|e| e.to_string()),
        SourceKind::Docx => text::extract_docx_text(file),
        SourceKind::Pdf => text::extract_pdf_text(file),
        SourceKind::Image | SourceKind::Unsupported => return None,
    };

    match result {
        Ok(content) if content.trim().is_empty() => {
            debug!(?file, "skipping file without text");
            None
        }
        Ok(content) => Some(content),
        Err(e) => {
            warn!(?file, error = %e, "failed to read source file, skipping");
            None
        }
    }
}

fn convert_to_pdf(
    layout: ConversionConfig,
    root: &Path,
    files: &[PathBuf],
    output_path: &Path,
) -> Result<ConversionReport> {
    let mut builder = PdfBuilder::new(layout);
    let mut converted = 0;
    let mut skipped = 0;

    for file in files {
        let kind = SourceKind::classify(file);
        let added = match kind {
            SourceKind::Pdf => match builder.append_pdf(file) {
                Ok(pages) => pages,
                Err(e) => {
                    warn!(?file, error = %e, "failed to load PDF, skipping");
                    0
                }
            },
            SourceKind::Image => match builder.append_image(file) {
                Ok(()) => 1,
                Err(e) => {
                    warn!(?file, error = %e, "failed to load image, skipping");
                    0
                }
            },
            SourceKind::Text | SourceKind::Docx => match read_source_text(kind, file) {
                Some(content) => builder
                    .append_text(&section_label(root, file), &content)
                    .map_err(conversion_failed)?,
                None => 0,
            },
            SourceKind::Unsupported => {
                debug!(?file, "unsupported file type, skipping");
                0
            }
        };

        if added > 0 {
            converted += 1;
        } else {
            skipped += 1;
        }
    }

    if builder.page_count() == 0 {
        return Err(Error::Pipeline(PipelineError::NoConvertibleContent {
            mode: OutputMode::Pdf,
        }));
    }

    let pages = builder.page_count();
    builder.save(output_path).map_err(conversion_failed)?;

    info!(
        ?output_path,
        pages, converted, skipped, "PDF artifact written"
    );

    Ok(ConversionReport {
        output_path: output_path.to_path_buf(),
        converted,
        skipped,
    })
}

fn convert_to_text(root: &Path, files: &[PathBuf], output_path: &Path) -> Result<ConversionReport> {
    let mut output = String::new();
    let mut converted = 0;
    let mut skipped = 0;

    for file in files {
        match read_source_text(SourceKind::classify(file), file) {
            Some(content) => {
                output.push_str(&format!(
                    "\n--- {} ---\n{}\n\n",
                    section_label(root, file),
                    content
                ));
                converted += 1;
            }
            None => skipped += 1,
        }
    }

    if converted == 0 {
        return Err(Error::Pipeline(PipelineError::NoConvertibleContent {
            mode: OutputMode::Txt,
        }));
    }

    std::fs::write(output_path, output.as_bytes())
        .map_err(|e| conversion_failed(format!("failed to write {}: {}", output_path.display(), e)))?;

    info!(?output_path, converted, skipped, "text artifact written");

    Ok(ConversionReport {
        output_path: output_path.to_path_buf(),
        converted,
        skipped,
    })
}

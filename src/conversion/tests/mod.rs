use crate::config::ConversionConfig;
use crate::conversion::pdf::PdfBuilder;
use crate::conversion::*;
use crate::error::{Error, PipelineError};
use crate::types::OutputMode;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write a small PDF with one page per entry in `pages`
fn write_pdf(path: &Path, pages: &[&str]) {
    let mut builder = PdfBuilder::new(ConversionConfig {
        lines_per_page: 100,
        ..ConversionConfig::default()
    });
    for (i, text) in pages.iter().enumerate() {
        builder.append_text(&format!("page {}", i + 1), text).unwrap();
    }
    builder.save(path).unwrap();
}

/// Write a minimal .docx containing the given paragraphs
fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("word/document.xml", zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap();
}

struct Workspace {
    _dir: TempDir,
    root: PathBuf,
    output_dir: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("extracted");
        std::fs::create_dir_all(&root).unwrap();
        let output_dir = dir.path().to_path_buf();
        Self {
            _dir: dir,
            root,
            output_dir,
        }
    }

    fn write(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn output(&self, mode: OutputMode) -> PathBuf {
        self.output_dir.join(format!("output.{}", mode.extension()))
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn classify_by_extension() {
    assert_eq!(SourceKind::classify(Path::new("a.PDF")), SourceKind::Pdf);
    assert_eq!(SourceKind::classify(Path::new("a.docx")), SourceKind::Docx);
    for ext in ["txt", "md", "csv", "log", "json", "xml", "html", "htm", "rst", "ini", "yaml", "yml"] {
        assert_eq!(
            SourceKind::classify(Path::new(&format!("a.{ext}"))),
            SourceKind::Text,
            "for {ext}"
        );
    }
    assert_eq!(SourceKind::classify(Path::new("a.doc")), SourceKind::Unsupported);
    for ext in ["jpg", "JPEG", "png", "gif", "bmp", "tiff", "tif", "webp"] {
        assert_eq!(
            SourceKind::classify(Path::new(&format!("a.{ext}"))),
            SourceKind::Image,
            "for {ext}"
        );
    }
    assert_eq!(SourceKind::classify(Path::new("Makefile")), SourceKind::Unsupported);
}

#[test]
fn section_label_is_relative_with_forward_slashes() {
    let root = Path::new("/w/extracted");
    assert_eq!(
        section_label(root, Path::new("/w/extracted/docs/a.txt")),
        "docs/a.txt"
    );
    assert_eq!(section_label(root, Path::new("other/b.txt")), "other/b.txt");
}

// ---------------------------------------------------------------------------
// txt mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn txt_mode_concatenates_sections_in_order() {
    let ws = Workspace::new();
    let files = vec![
        ws.write("readme.txt", b"Hello"),
        ws.write("docs/notes.md", b"# Notes"),
    ];
    let output = ws.output(OutputMode::Txt);

    let report = BuiltinConverter::default()
        .convert(OutputMode::Txt, &ws.root, &files, &output)
        .await
        .unwrap();

    assert_eq!(report.output_path, output);
    assert_eq!(report.converted, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "\n--- readme.txt ---\nHello\n\n\n--- docs/notes.md ---\n# Notes\n\n"
    );
}

#[tokio::test]
async fn txt_mode_skips_unsupported_and_blank_files() {
    let ws = Workspace::new();
    let files = vec![
        ws.write("image.png", b"\x89PNG\r\n"),
        ws.write("empty.txt", b"   \n"),
        ws.write("data.csv", b"a,b"),
    ];
    let output = ws.output(OutputMode::Txt);

    let report = BuiltinConverter::default()
        .convert(OutputMode::Txt, &ws.root, &files, &output)
        .await
        .unwrap();

    assert_eq!(report.converted, 1);
    assert_eq!(report.skipped, 2);
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("--- data.csv ---"));
    assert!(!text.contains("image.png"));
    assert!(!text.contains("empty.txt"));
}

#[tokio::test]
async fn txt_mode_reads_docx_paragraphs() {
    let ws = Workspace::new();
    let docx = ws.root.join("letter.docx");
    write_docx(&docx, &["Dear reader,", "Regards"]);
    let output = ws.output(OutputMode::Txt);

    BuiltinConverter::default()
        .convert(OutputMode::Txt, &ws.root, &[docx], &output)
        .await
        .unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("--- letter.docx ---"));
    assert!(text.contains("Dear reader,\nRegards"));
}

#[tokio::test]
async fn txt_mode_extracts_pdf_text() {
    let ws = Workspace::new();
    let source_pdf = ws.root.join("scan.pdf");
    write_pdf(&source_pdf, &["alpha"]);
    let output = ws.output(OutputMode::Txt);

    let report = BuiltinConverter::default()
        .convert(OutputMode::Txt, &ws.root, &[source_pdf], &output)
        .await
        .unwrap();

    assert_eq!(report.converted, 1);
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("\n--- scan.pdf ---\n"));
    assert!(text.contains("alpha"));
}

#[tokio::test]
async fn txt_mode_with_nothing_convertible_fails() {
    let ws = Workspace::new();
    let files = vec![ws.write("photo.jpg", b"\xff\xd8\xff")];
    let output = ws.output(OutputMode::Txt);

    let err = BuiltinConverter::default()
        .convert(OutputMode::Txt, &ws.root, &files, &output)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Pipeline(PipelineError::NoConvertibleContent {
            mode: OutputMode::Txt
        })
    ));
    assert!(!output.exists());
}

// ---------------------------------------------------------------------------
// pdf mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pdf_mode_merges_pdfs_and_renders_text() {
    let ws = Workspace::new();
    let source_pdf = ws.root.join("report.pdf");
    write_pdf(&source_pdf, &["first page", "second page"]);
    let files = vec![
        ws.write("intro.txt", b"Introduction"),
        source_pdf,
        ws.write("archive.bin", b"\x00\x01"),
    ];
    let output = ws.output(OutputMode::Pdf);

    let report = BuiltinConverter::default()
        .convert(OutputMode::Pdf, &ws.root, &files, &output)
        .await
        .unwrap();

    assert_eq!(report.converted, 2);
    assert_eq!(report.skipped, 1);

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    let doc = lopdf::Document::load(&output).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

#[tokio::test]
async fn pdf_mode_adds_one_page_per_image() {
    let ws = Workspace::new();
    let png = ws.root.join("scans/page1.png");
    std::fs::create_dir_all(png.parent().unwrap()).unwrap();
    image::RgbImage::from_pixel(64, 48, image::Rgb([10, 120, 200]))
        .save(&png)
        .unwrap();
    let jpg = ws.root.join("scans/page2.jpg");
    image::GrayImage::from_pixel(800, 1200, image::Luma([128]))
        .save(&jpg)
        .unwrap();
    let files = vec![ws.write("cover.txt", b"Scanned letters"), png, jpg];
    let output = ws.output(OutputMode::Pdf);

    let report = BuiltinConverter::default()
        .convert(OutputMode::Pdf, &ws.root, &files, &output)
        .await
        .unwrap();

    assert_eq!(report.converted, 3);
    assert_eq!(report.skipped, 0);
    let doc = lopdf::Document::load(&output).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

#[tokio::test]
async fn txt_mode_skips_images() {
    let ws = Workspace::new();
    let png = ws.root.join("scan.png");
    image::RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0]))
        .save(&png)
        .unwrap();
    let files = vec![png, ws.write("notes.txt", b"typed notes")];
    let output = ws.output(OutputMode::Txt);

    let report = BuiltinConverter::default()
        .convert(OutputMode::Txt, &ws.root, &files, &output)
        .await
        .unwrap();

    assert_eq!(report.converted, 1);
    assert_eq!(report.skipped, 1);
    assert!(!std::fs::read_to_string(&output).unwrap().contains("scan.png"));
}

#[tokio::test]
async fn pdf_mode_skips_corrupt_pdf() {
    let ws = Workspace::new();
    let files = vec![
        ws.write("broken.pdf", b"%PDF-1.4 garbage"),
        ws.write("ok.txt", b"still fine"),
    ];
    let output = ws.output(OutputMode::Pdf);

    let report = BuiltinConverter::default()
        .convert(OutputMode::Pdf, &ws.root, &files, &output)
        .await
        .unwrap();

    assert_eq!(report.converted, 1);
    assert_eq!(report.skipped, 1);
    assert!(output.exists());
}

#[tokio::test]
async fn pdf_mode_with_nothing_convertible_fails() {
    let ws = Workspace::new();
    let files = vec![ws.write("song.mp3", b"ID3")];
    let output = ws.output(OutputMode::Pdf);

    let err = BuiltinConverter::default()
        .convert(OutputMode::Pdf, &ws.root, &files, &output)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Pipeline(PipelineError::NoConvertibleContent {
            mode: OutputMode::Pdf
        })
    ));
    assert!(!output.exists());
}

#[tokio::test]
async fn pdf_mode_renders_non_latin_text_without_failing() {
    let ws = Workspace::new();
    let files = vec![ws.write("unicode.txt", "日本語 and (parens) \\ backslash".as_bytes())];
    let output = ws.output(OutputMode::Pdf);

    BuiltinConverter::new(ConversionConfig::default())
        .convert(OutputMode::Pdf, &ws.root, &files, &output)
        .await
        .unwrap();

    let doc = lopdf::Document::load(&output).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn builtin_converter_name() {
    assert_eq!(BuiltinConverter::default().name(), "builtin");
}

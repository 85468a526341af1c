//! Text sources: plain text files, PDF text, and Word documents

use regex::Regex;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

static PARAGRAPH_END: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"</w:p>|<w:br\s*/>|<w:cr\s*/>").ok());
static TAB: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<w:tab\s*/>").ok());
static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());

/// Read a text file, replacing invalid UTF-8 sequences
pub(crate) fn read_text_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extract the text layer of a PDF
///
/// `pdf-extract` panics on some malformed inputs; the panic is contained and
/// reported as an error.
pub(crate) fn extract_pdf_text(path: &Path) -> Result<String, String> {
    let owned = path.to_path_buf();
    match std::panic::catch_unwind(move || pdf_extract::extract_text(&owned)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(format!("{:?}", e)),
        Err(_) => Err("PDF text extraction panicked".to_string()),
    }
}

/// Extract paragraph text from a `.docx` file
pub(crate) fn extract_docx_text(path: &Path) -> Result<String, String> {
    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing word/document.xml: {}", e))?;

    let mut xml = String::new();
    entry.read_to_string(&mut xml).map_err(|e| e.to_string())?;

    Ok(docx_xml_to_text(&xml))
}

/// Flatten WordprocessingML into plain text, one paragraph per line
pub(crate) fn docx_xml_to_text(xml: &str) -> String {
    let (Some(paragraph_end), Some(tab), Some(tag)) =
        (PARAGRAPH_END.as_ref(), TAB.as_ref(), TAG.as_ref())
    else {
        return String::new();
    };

    let text = paragraph_end.replace_all(xml, "\n");
    let text = tab.replace_all(&text, "\t");
    let text = tag.replace_all(&text, "");
    unescape_xml(&text).trim().to_string()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

//! Plain-text extraction for stored document files.
//!
//! The ingestion pipeline hands this module a file path plus a content-type
//! string; it returns plain UTF-8 text. The supported set is closed: plain
//! text (and markdown), PDF, and DOCX. Anything else fails before any chunk
//! is created.

use std::io::Read;
use std::path::Path;

/// Supported content types.
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_MARKDOWN: &str = "text/markdown";
pub const CONTENT_TYPE_PDF: &str = "application/pdf";
pub const CONTENT_TYPE_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Maximum decompressed bytes read from a DOCX ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction failure. `UnsupportedContentType` aborts ingestion before any
/// state is created; the other variants are fatal to the one document.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedContentType(String),
    Io(String),
    Pdf(String),
    Docx(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedContentType(ct) => {
                write!(f, "unsupported content-type: {}", ct)
            }
            ExtractError::Io(e) => write!(f, "could not read document file: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Docx(e) => write!(f, "DOCX extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Whether `content_type` belongs to the closed supported set.
pub fn is_supported(content_type: &str) -> bool {
    matches!(
        content_type,
        CONTENT_TYPE_TEXT | CONTENT_TYPE_MARKDOWN | CONTENT_TYPE_PDF | CONTENT_TYPE_DOCX
    )
}

/// Extract plain text from the stored file at `path`.
pub fn extract_text(path: &Path, content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        CONTENT_TYPE_TEXT | CONTENT_TYPE_MARKDOWN => {
            std::fs::read_to_string(path).map_err(|e| ExtractError::Io(e.to_string()))
        }
        CONTENT_TYPE_PDF => {
            let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
        CONTENT_TYPE_DOCX => {
            let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
            extract_docx(&bytes)
        }
        other => Err(ExtractError::UnsupportedContentType(other.to_string())),
    }
}

/// Pull the text runs out of `word/document.xml`, one line per paragraph.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::Docx(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(doc_xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                // Paragraph boundary: keep extracted text line-structured.
                if e.local_name().as_ref() == b"p" && !out.ends_with('\n') && !out.is_empty() {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

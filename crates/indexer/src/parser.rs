use crate::error::ParseError;
use sopcheck_protocol::Passage;
use std::io::{Cursor, Read};
use std::path::Path;

const DOCX_BODY: &str = "word/document.xml";

/// Splits a document into page-level passages.
///
/// Text extraction itself is an external concern; implementations only have to
/// hand back non-empty passages with their source metadata.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<Vec<Passage>, ParseError>;
}

/// Parser for the formats the CLI accepts out of the box.
///
/// - `.pdf`: one passage per non-empty page
/// - `.docx`: all non-empty paragraphs, newline-joined, as a single page-1 passage
/// - `.txt` / `.md`: pages separated by form feed (`\x0c`)
#[derive(Debug, Default, Clone, Copy)]
pub struct FileParser;

impl FileParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn parse_pdf(path: &Path, source: &str) -> Result<Vec<Passage>, ParseError> {
        let pdf_error = |err: lopdf::Error| ParseError::Pdf {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let document = lopdf::Document::load(path).map_err(pdf_error)?;

        let mut passages = Vec::new();
        for page in document.get_pages().keys() {
            let text = document.extract_text(&[*page]).map_err(pdf_error)?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            passages.push(Passage::new(text, source, *page));
        }
        Ok(passages)
    }

    fn parse_docx(path: &Path, source: &str) -> Result<Vec<Passage>, ParseError> {
        let docx_error = |message: String| ParseError::Docx {
            path: path.to_path_buf(),
            message,
        };
        let bytes = std::fs::read(path)?;
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| docx_error(format!("not a ZIP archive: {e}")))?;
        let mut xml = String::new();
        archive
            .by_name(DOCX_BODY)
            .map_err(|e| docx_error(format!("{DOCX_BODY}: {e}")))?
            .read_to_string(&mut xml)?;

        let text = docx_paragraphs(&xml).join("\n");
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Passage::new(text, source, 1)])
    }

    fn parse_text(path: &Path, source: &str) -> Result<Vec<Passage>, ParseError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(split_pages(&raw, source))
    }
}

impl DocumentParser for FileParser {
    fn parse(&self, path: &Path) -> Result<Vec<Passage>, ParseError> {
        if !path.exists() {
            return Err(ParseError::NotFound(path.to_path_buf()));
        }

        let source = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("DOC")
            .to_string();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let passages = match extension.as_str() {
            "pdf" => Self::parse_pdf(path, &source)?,
            "docx" => Self::parse_docx(path, &source)?,
            "txt" | "md" => Self::parse_text(path, &source)?,
            _ => {
                return Err(ParseError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    extension,
                })
            }
        };
        log::debug!("Parsed {} into {} passages", path.display(), passages.len());
        Ok(passages)
    }
}

fn split_pages(raw: &str, source: &str) -> Vec<Passage> {
    raw.split('\x0c')
        .enumerate()
        .filter_map(|(idx, page)| {
            let text = page.trim();
            (!text.is_empty()).then(|| Passage::new(text, source, idx as u32 + 1))
        })
        .collect()
}

/// Text of each non-empty `<w:p>` in WordprocessingML, runs concatenated.
fn docx_paragraphs(xml: &str) -> Vec<String> {
    xml.split("</w:p>")
        .filter_map(|paragraph| {
            let text = run_text(paragraph);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect()
}

fn run_text(xml: &str) -> String {
    let mut text = String::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<w:t") {
        let tag = &rest[start + 4..];
        let Some(close) = tag.find('>') else {
            break;
        };
        // `<w:tab/>`, `<w:tbl>` and friends share the prefix.
        let is_text = matches!(tag.as_bytes().first(), Some(b'>' | b' '));
        let self_closing = tag[..close].ends_with('/');
        rest = &tag[close + 1..];
        if !is_text || self_closing {
            continue;
        }
        let end = rest.find("</w:t>").unwrap_or(rest.len());
        text.push_str(&decode_entities(&rest[..end]));
        rest = &rest[end..];
    }
    text
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

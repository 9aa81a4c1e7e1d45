mod docx;
mod pdf;

pub use docx::extract_docx_text;
pub use pdf::extract_pdf_text;

use crate::error::{AppResult, Error};
use std::path::Path;
use tracing::info;

/// User-facing text for formats the extractor cannot read
pub const UNSUPPORTED_FORMAT_MESSAGE: &str = "対応してないファイル形式だよ！";

/// Document formats the extractor knows how to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    /// Anything else, carrying the lowercased extension (empty if none)
    Unsupported(String),
}

impl DocumentKind {
    /// Classify a file by its extension, ignoring case
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => DocumentKind::Pdf,
            "docx" => DocumentKind::Docx,
            _ => DocumentKind::Unsupported(extension),
        }
    }

    /// Fail for formats that have no extractor
    pub fn ensure_supported(&self) -> AppResult<()> {
        match self {
            DocumentKind::Unsupported(ext) => Err(unsupported(ext)),
            _ => Ok(()),
        }
    }
}

fn unsupported(extension: &str) -> Error {
    if extension.is_empty() {
        Error::UnsupportedFormat("file has no extension".to_string())
    } else {
        Error::UnsupportedFormat(format!(".{}", extension))
    }
}

/// Extract the full text of a document as one string.
///
/// Pages and paragraphs are joined with no separator, so words on either
/// side of a boundary may run together.
pub fn extract_text(path: &Path) -> AppResult<String> {
    let text = match DocumentKind::from_path(path) {
        DocumentKind::Pdf => extract_pdf_text(path)?,
        DocumentKind::Docx => extract_docx_text(path)?,
        DocumentKind::Unsupported(ext) => return Err(unsupported(&ext)),
    };

    info!(
        "Extracted {} characters from {}",
        text.chars().count(),
        path.display()
    );
    Ok(text)
}

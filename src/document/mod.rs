//! Document text extraction
//!
//! Produces the normalized [`DocumentText`] the mention locator scans:
//! - PDF text extraction via `pdf-extract` (page order preserved)
//! - Plain text files read as-is
//! - Line endings normalized and hyphenated line wraps rejoined

use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Full normalized text of a source document
///
/// Construction always applies [`normalize_document_text`], so a
/// `DocumentText` never contains a word split across a hyphenated line break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    text: String,
    char_len: usize,
}

impl DocumentText {
    /// Normalize raw extracted text into a document
    pub fn new(raw: &str) -> Self {
        let text = normalize_document_text(raw);
        let char_len = text.chars().count();
        Self { text, char_len }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for DocumentText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for DocumentText {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Rejoin words broken by a hyphen at a line boundary (`manu-\nfacturing`)
pub fn rejoin_hyphenated_lines(text: &str) -> String {
    static HYPHEN_WRAP_RE: OnceLock<Regex> = OnceLock::new();

    let re = HYPHEN_WRAP_RE
        .get_or_init(|| Regex::new(r"(\w+)-\n(\w+)").expect("Invalid regex pattern"));

    re.replace_all(text, "${1}${2}").into_owned()
}

/// Normalize line endings and page breaks, then rejoin hyphenated wraps
pub fn normalize_document_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace(['\r', '\x0c'], "\n");
    rejoin_hyphenated_lines(&unified)
}

/// Extract the text of a document on disk
///
/// `.pdf` files go through the PDF extractor; anything else is read as UTF-8
/// text.
///
/// # Errors
///
/// - [`Error::InputNotFound`] if the file does not exist
/// - [`Error::Document`] if text extraction fails
pub fn extract_text(path: &Path) -> Result<DocumentText> {
    if !path.exists() {
        return Err(Error::not_found("Document", path));
    }

    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let raw = if is_pdf {
        pdf_extract::extract_text(path).map_err(|e| Error::Document {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
    } else {
        std::fs::read_to_string(path).map_err(|e| Error::Document {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
    };

    let document = DocumentText::new(&raw);

    tracing::info!(
        path = %path.display(),
        chars = document.char_len(),
        pdf = is_pdf,
        "Extracted document text"
    );

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rejoin_hyphenated_lines() {
        assert_eq!(
            rejoin_hyphenated_lines("the manu-\nfacturing process"),
            "the manufacturing process"
        );
        // Hyphens inside a line are left alone
        assert_eq!(rejoin_hyphenated_lines("year-over-year"), "year-over-year");
        // A hyphen followed by a blank line is not a wrap
        assert_eq!(rejoin_hyphenated_lines("end-\n\nstart"), "end-\n\nstart");
    }

    #[test]
    fn test_normalize_handles_crlf_and_form_feed() {
        assert_eq!(
            normalize_document_text("wear-\r\nables\x0cnext page"),
            "wearables\nnext page"
        );
    }

    #[test]
    fn test_document_char_len_counts_characters() {
        let doc = DocumentText::new("café—iPhone");
        assert_eq!(doc.char_len(), 11);
        assert!(doc.as_str().len() > 11);
    }

    #[test]
    fn test_extract_plain_text() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Apple Watch sales in-\ncreased").unwrap();

        let doc = extract_text(file.path()).unwrap();
        assert_eq!(doc.as_str(), "Apple Watch sales increased");
    }

    #[test]
    fn test_extract_missing_file() {
        let err = extract_text(Path::new("/nonexistent/10q.pdf")).unwrap_err();
        assert!(matches!(err, Error::InputNotFound { kind: "Document", .. }));
    }

    #[test]
    fn test_extract_invalid_pdf() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"not a pdf").unwrap();

        let err = extract_text(file.path()).unwrap_err();
        assert!(matches!(err, Error::Document { .. }));
    }
}

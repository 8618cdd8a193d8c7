//! Text extraction: turns uploaded PDF/DOCX bytes into plain text.
//!
//! Pure and CPU-bound. Callers on the async runtime should run `extract`
//! on the blocking pool.

pub mod docx;
pub mod pdf;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Picks the format from the content-type hint, falling back to the object's
    /// extension when the hint is missing or generic.
    pub fn detect(content_type: Option<&str>, object_id: &str) -> Result<Self, ExtractionError> {
        if let Some(format) = content_type.and_then(Self::from_mime) {
            return Ok(format);
        }

        mime_guess::from_path(object_id)
            .iter_raw()
            .find_map(Self::from_mime)
            .ok_or_else(|| {
                ExtractionError::UnsupportedFormat(format!(
                    "{object_id} (content type: {})",
                    content_type.unwrap_or("none")
                ))
            })
    }

    fn from_mime(mime: &str) -> Option<Self> {
        // Strip parameters such as "; charset=binary"
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence.eq_ignore_ascii_case(PDF_MIME) {
            Some(Self::Pdf)
        } else if essence.eq_ignore_ascii_case(DOCX_MIME) {
            Some(Self::Docx)
        } else {
            None
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => f.write_str("PDF"),
            DocumentFormat::Docx => f.write_str("DOCX"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to extract {format} text: {message}")]
    Malformed {
        format: DocumentFormat,
        message: String,
    },
}

impl ExtractionError {
    pub(crate) fn malformed(format: DocumentFormat, message: impl fmt::Display) -> Self {
        ExtractionError::Malformed {
            format,
            message: message.to_string(),
        }
    }
}

/// Plain text of one document. Lives only for the duration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub format: DocumentFormat,
}

/// Extracts text from `bytes` according to `format`.
pub fn extract(bytes: &[u8], format: DocumentFormat) -> Result<ExtractedText, ExtractionError> {
    let text = match format {
        DocumentFormat::Pdf => pdf::extract_pdf_text(bytes)?,
        DocumentFormat::Docx => docx::extract_docx_text(bytes)?,
    };
    Ok(ExtractedText { text, format })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_prefers_content_type_hint() {
        let format = DocumentFormat::detect(Some("application/pdf"), "cv.docx").unwrap();
        assert_eq!(format, DocumentFormat::Pdf);
    }

    #[test]
    fn test_detect_falls_back_to_extension_for_generic_hint() {
        let format =
            DocumentFormat::detect(Some("application/octet-stream"), "Jane_Doe_CV.DOCX").unwrap();
        assert_eq!(format, DocumentFormat::Docx);

        let format = DocumentFormat::detect(None, "uploads/cv.pdf").unwrap();
        assert_eq!(format, DocumentFormat::Pdf);
    }

    #[test]
    fn test_detect_ignores_mime_parameters() {
        let format = DocumentFormat::detect(Some("application/pdf; charset=binary"), "x").unwrap();
        assert_eq!(format, DocumentFormat::Pdf);
    }

    #[test]
    fn test_detect_rejects_unknown_formats() {
        let err = DocumentFormat::detect(Some("text/plain"), "cv.txt").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));

        let err = DocumentFormat::detect(None, "resume").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_extract_malformed_pdf_is_an_extraction_error() {
        let err = extract(b"definitely not a pdf", DocumentFormat::Pdf).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Malformed {
                format: DocumentFormat::Pdf,
                ..
            }
        ));
    }
}

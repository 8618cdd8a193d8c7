use std::panic::{self, AssertUnwindSafe};

use super::{DocumentFormat, ExtractionError};

/// Extracts the text of every page in order, joined by `\n`.
///
/// Pages without extractable text contribute an empty string so page
/// boundaries stay aligned with the source document.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs instead of returning an error
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| ExtractionError::malformed(DocumentFormat::Pdf, "PDF parser aborted"))?
    .map_err(|e| ExtractionError::malformed(DocumentFormat::Pdf, e))?;

    if pages.is_empty() {
        return Err(ExtractionError::malformed(
            DocumentFormat::Pdf,
            "document has no readable pages",
        ));
    }

    tracing::debug!(pages = pages.len(), "Extracted PDF text");
    Ok(pages.join("\n"))
}

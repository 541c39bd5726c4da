use super::{ExtractionError, Extractor, Format};
use std::panic::{AssertUnwindSafe, catch_unwind};

const PDF_MARKER: &[u8] = b"%PDF-";
const HEADER_WINDOW: usize = 1024;

/// PDF text extraction via `pdf-extract`.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        if !has_pdf_header(bytes) {
            return Err(ExtractionError::corrupt(
                Format::Pdf,
                "missing %PDF- header",
            ));
        }

        tracing::debug!(bytes = bytes.len(), "Starting PDF extraction");

        // pdf-extract (and its font parsers) can panic on malformed glyph tables.
        match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(error)) => {
                let reason = error.to_string();
                tracing::warn!(error = %reason, "PDF extraction failed");
                Err(classify_failure(reason))
            }
            Err(_) => {
                tracing::error!("PDF extraction panicked; likely malformed fonts");
                Err(ExtractionError::corrupt(
                    Format::Pdf,
                    "parser panicked on malformed content",
                ))
            }
        }
    }

    fn name(&self) -> &'static str {
        "pdf"
    }
}

/// Password-protected files are unsupported; any other parser failure means corruption.
fn classify_failure(reason: String) -> ExtractionError {
    let lowered = reason.to_lowercase();
    if lowered.contains("decrypt") || lowered.contains("encrypt") {
        ExtractionError::unsupported(Format::Pdf, reason)
    } else {
        ExtractionError::corrupt(Format::Pdf, reason)
    }
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    window
        .windows(PDF_MARKER.len())
        .any(|candidate| candidate == PDF_MARKER)
}

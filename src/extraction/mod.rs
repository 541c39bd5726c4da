//! Format detection and per-format text extraction.
//!
//! Detection only looks at the declared filename and mime type. Once a format is chosen the
//! [`ExtractorRegistry`] builds the matching [`Extractor`], which turns raw bytes into plain text.
//! Images never pass through an extractor; the pipeline forwards them to a vision model as-is.

mod detect;
mod docx;
mod ooxml;
mod pdf;
mod pptx;
mod registry;
mod text;

pub use detect::detect_format;
pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use pptx::PptxExtractor;
pub use registry::{ExtractorFactory, ExtractorRegistry};
pub use text::PlainTextExtractor;

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of an uploaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Raster image forwarded to a vision model.
    Image,
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Office Open XML presentation.
    Pptx,
    /// UTF-8 (or near enough) plain text.
    #[serde(rename = "txt")]
    PlainText,
    /// Anything else; rejected before extraction.
    Unsupported,
}

impl Format {
    /// Short lowercase label used in logs and API responses; matches the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::PlainText => "txt",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure raised while converting a recognized document into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Bytes do not form a valid document of the declared format.
    #[error("{format} document is corrupt: {reason}")]
    Corrupt {
        /// Format the bytes were parsed as.
        format: Format,
        /// Parser diagnostic.
        reason: String,
    },
    /// Document is well-formed but uses a variant this service cannot read.
    #[error("{format} variant is not supported: {reason}")]
    UnsupportedSubformat {
        /// Format the bytes were parsed as.
        format: Format,
        /// Parser diagnostic.
        reason: String,
    },
}

impl ExtractionError {
    pub(crate) fn corrupt(format: Format, reason: impl fmt::Display) -> Self {
        Self::Corrupt {
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(format: Format, reason: impl fmt::Display) -> Self {
        Self::UnsupportedSubformat {
            format,
            reason: reason.to_string(),
        }
    }
}

/// Converter from raw document bytes to plain text.
///
/// Implementations are synchronous and CPU-bound; the pipeline runs them on the blocking pool.
pub trait Extractor: Send + Sync {
    /// Extract the document's linear text content.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;

    /// Human-readable name for logs.
    fn name(&self) -> &'static str;
}

//! Core data types and error definitions for the summarization pipeline.

use crate::completion::CompletionError;
use crate::extraction::{ExtractionError, Format};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Uploaded payload plus its declared metadata; the pipeline's sole input.
#[derive(Clone)]
pub struct Artifact {
    bytes: Vec<u8>,
    filename: String,
    mime_type: String,
}

impl Artifact {
    /// Wrap raw bytes with the filename and mime type declared by the uploader.
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Raw payload.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared filename (possibly empty).
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Declared mime type (possibly empty).
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Hex SHA-256 of the payload, used to correlate logs without logging content.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Plain text extracted from an artifact. Never blank.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    text: String,
    format: Format,
}

impl ExtractedDocument {
    /// Accept extracted text, rejecting empty or whitespace-only content.
    pub fn new(format: Format, text: String) -> Result<Self, ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyContent { format });
        }
        Ok(Self { text, format })
    }

    /// Extracted text, untouched.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Format the text came from.
    pub fn format(&self) -> Format {
        self.format
    }
}

/// Completion output for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSummary {
    /// Zero-based index of the summarized chunk.
    pub index: usize,
    /// Generated text.
    pub text: String,
}

/// One invocation of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct SummarizeRequest {
    /// Uploaded artifact; `None` when the caller supplied nothing.
    pub artifact: Option<Artifact>,
    /// Overall deadline; falls back to the service default.
    pub deadline: Option<Duration>,
}

impl SummarizeRequest {
    /// Request for `artifact` with the service's default deadline.
    pub fn new(artifact: Artifact) -> Self {
        Self {
            artifact: Some(artifact),
            deadline: None,
        }
    }

    /// Override the overall deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Final summary plus per-request diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryOutcome {
    /// The final summary text.
    pub summary: String,
    /// Detected artifact format.
    pub format: Format,
    /// Chunks produced from the extracted text (zero for images).
    pub chunk_count: usize,
    /// Completion endpoint invocations issued for this artifact.
    pub completion_calls: usize,
    /// Whether the reduce pass degraded to plain concatenation.
    pub reduce_fallback: bool,
}

/// Errors produced while planning chunks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// A zero-character window can never make progress.
    #[error("chunk window size must be greater than zero")]
    InvalidWindowSize,
}

/// Fatal misconfiguration detected before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No completion model identifier was configured.
    #[error("completion model identifier is not configured (set COMPLETION_MODEL)")]
    MissingModel,
    /// The chunking policy cannot be applied.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
}

/// Input rejected before any completion call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The request carried no artifact.
    #[error("no file was supplied")]
    MissingArtifact,
    /// Filename and mime type match no supported format.
    #[error(
        "unsupported file '{filename}' ({mime_type}); supported: PDF, DOCX, PPTX, TXT, images (PNG/JPG/WEBP)"
    )]
    UnsupportedFormat {
        /// Declared filename.
        filename: String,
        /// Declared mime type.
        mime_type: String,
    },
    /// Extraction succeeded but produced no text.
    #[error("{format} document has no content")]
    EmptyContent {
        /// Format of the empty document.
        format: Format,
    },
}

/// Pipeline step that was running when a deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Text extraction.
    Extraction,
    /// Vision summary of an image.
    ImageSummary,
    /// Summary of the chunk at the given zero-based index.
    ChunkSummary(usize),
    /// Merge of partial summaries.
    Reduce,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction => f.write_str("extraction"),
            Self::ImageSummary => f.write_str("image summary"),
            Self::ChunkSummary(index) => write!(f, "summary of chunk {}", index + 1),
            Self::Reduce => f.write_str("reduce pass"),
        }
    }
}

/// Classified, terminal failure of one pipeline invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Service misconfiguration.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Rejected input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    /// Recognized document that could not be read.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    /// Completion endpoint failure.
    #[error("transport error: {0}")]
    Transport(#[from] CompletionError),
    /// Caller deadline expired.
    #[error("deadline of {deadline:?} exceeded during {stage}")]
    Timeout {
        /// Deadline that applied to the request.
        deadline: Duration,
        /// Step that was cut short.
        stage: PipelineStage,
    },
}

/// Coarse error class reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClassification {
    /// See [`PipelineError::Configuration`].
    Configuration,
    /// See [`PipelineError::Validation`].
    Validation,
    /// See [`PipelineError::Extraction`].
    Extraction,
    /// See [`PipelineError::Transport`].
    Transport,
    /// See [`PipelineError::Timeout`].
    Timeout,
}

impl PipelineError {
    /// Class of this error.
    pub fn classification(&self) -> ErrorClassification {
        match self {
            Self::Configuration(_) => ErrorClassification::Configuration,
            Self::Validation(_) => ErrorClassification::Validation,
            Self::Extraction(_) => ErrorClassification::Extraction,
            Self::Transport(_) => ErrorClassification::Transport,
            Self::Timeout { .. } => ErrorClassification::Timeout,
        }
    }
}

//! Summarization pipeline: validation, extraction, chunking, and map-reduce over completions.

pub mod chunking;
mod prompts;
mod service;
pub mod types;

pub use prompts::{FALLBACK_SEPARATOR, PARTIAL_SEPARATOR};
pub use service::{SummarizationService, SummarizeApi, SummaryOptions};
pub use types::{
    Artifact, ChunkingError, ConfigurationError, ErrorClassification, ExtractedDocument,
    PartialSummary, PipelineError, PipelineStage, SummarizeRequest, SummaryOutcome,
    ValidationError,
};

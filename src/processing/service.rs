//! Summarization service coordinating detection, extraction, chunking, and completion calls.

use crate::{
    completion::{CompletionClient, CompletionError, CompletionRequest, HttpCompletionClient},
    config::{Config, DEFAULT_SUMMARY_LANGUAGE},
    extraction::{ExtractionError, ExtractorRegistry, Format, detect_format},
    metrics::{MetricsSnapshot, SummaryMetrics},
    processing::{
        chunking::{ChunkingPolicy, chunk_text, estimate_tokens},
        prompts::{self, FALLBACK_SEPARATOR},
        types::{
            Artifact, ConfigurationError, ExtractedDocument, PartialSummary, PipelineError,
            PipelineStage, SummarizeRequest, SummaryOutcome, ValidationError,
        },
    },
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Per-service knobs for the summarization pipeline.
#[derive(Debug, Clone)]
pub struct SummaryOptions {
    /// Completion model identifier. Requests fail with a configuration error when unset.
    pub model: Option<String>,
    /// When and how extracted text is split.
    pub chunking: ChunkingPolicy,
    /// Language every prompt asks the model to answer in.
    pub language: String,
    /// Deadline applied when a request does not carry its own.
    pub default_deadline: Option<Duration>,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            model: None,
            chunking: ChunkingPolicy::default(),
            language: DEFAULT_SUMMARY_LANGUAGE.to_string(),
            default_deadline: None,
        }
    }
}

impl SummaryOptions {
    /// Options derived from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.completion_model.clone(),
            chunking: ChunkingPolicy {
                safe_token_threshold: config.safe_token_threshold,
                window_chars: config.chunk_chars,
            },
            language: config.summary_language.clone(),
            default_deadline: config.summary_deadline,
        }
    }
}

/// Turns one uploaded artifact into one summary.
///
/// Images go to the completion endpoint as a single multimodal call. Text-bearing documents are
/// extracted, split when they exceed the safe size, summarized chunk by chunk (strictly one call
/// in flight), and merged by a reduce call that degrades to plain concatenation if it fails.
/// Build once near process start and share through an `Arc`.
pub struct SummarizationService {
    client: Arc<dyn CompletionClient>,
    registry: ExtractorRegistry,
    options: SummaryOptions,
    metrics: Arc<SummaryMetrics>,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait SummarizeApi: Send + Sync {
    /// Summarize one artifact.
    async fn summarize(&self, request: SummarizeRequest) -> Result<SummaryOutcome, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl SummarizationService {
    /// Service over an arbitrary completion backend with the built-in extractors.
    pub fn new(client: Arc<dyn CompletionClient>, options: SummaryOptions) -> Self {
        Self {
            client,
            registry: ExtractorRegistry::new(),
            options,
            metrics: Arc::new(SummaryMetrics::new()),
        }
    }

    /// Service talking to the configured HTTP completion endpoint.
    pub fn from_config(config: &Config) -> Result<Self, CompletionError> {
        let client = HttpCompletionClient::from_config(config)?;
        tracing::info!(
            base_url = %config.completion_base_url,
            model = config.completion_model.as_deref().unwrap_or("<unset>"),
            "Completion client initialized"
        );
        Ok(Self::new(Arc::new(client), SummaryOptions::from_config(config)))
    }

    /// Replace the extractor registry.
    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &SummaryOptions {
        &self.options
    }

    /// Summarize one artifact, recording metrics for the outcome.
    pub async fn summarize(
        &self,
        request: SummarizeRequest,
    ) -> Result<SummaryOutcome, PipelineError> {
        let request_id = Uuid::new_v4();
        let budget = request.deadline.or(self.options.default_deadline);
        let mut run = PipelineRun {
            service: self,
            deadline: budget.map(|budget| Deadline {
                at: Instant::now() + budget,
                budget,
            }),
            completion_calls: 0,
        };

        let started = std::time::Instant::now();
        let span = tracing::info_span!("summarize", %request_id);
        let result = run.execute(request.artifact).instrument(span).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(outcome) => {
                self.metrics.record_success(
                    outcome.chunk_count as u64,
                    outcome.completion_calls as u64,
                    outcome.reduce_fallback,
                );
                tracing::info!(
                    %request_id,
                    format = %outcome.format,
                    chunks = outcome.chunk_count,
                    completion_calls = outcome.completion_calls,
                    reduce_fallback = outcome.reduce_fallback,
                    elapsed_ms,
                    "Summary complete"
                );
            }
            Err(error) => {
                self.metrics.record_failure(run.completion_calls as u64);
                tracing::warn!(
                    %request_id,
                    classification = ?error.classification(),
                    completion_calls = run.completion_calls,
                    elapsed_ms,
                    error = %error,
                    "Summarization failed"
                );
            }
        }

        result
    }

    /// Current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl SummarizeApi for SummarizationService {
    async fn summarize(&self, request: SummarizeRequest) -> Result<SummaryOutcome, PipelineError> {
        SummarizationService::summarize(self, request).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummarizationService::metrics_snapshot(self)
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    budget: Duration,
}

/// State for a single invocation.
struct PipelineRun<'s> {
    service: &'s SummarizationService,
    deadline: Option<Deadline>,
    completion_calls: usize,
}

impl PipelineRun<'_> {
    async fn execute(
        &mut self,
        artifact: Option<Artifact>,
    ) -> Result<SummaryOutcome, PipelineError> {
        let options = &self.service.options;
        let model = options
            .model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .ok_or(ConfigurationError::MissingModel)?
            .to_string();
        options
            .chunking
            .validate()
            .map_err(ConfigurationError::from)?;

        let artifact = artifact.ok_or(ValidationError::MissingArtifact)?;
        let format = detect_format(artifact.filename(), artifact.mime_type());
        tracing::info!(
            %format,
            filename = artifact.filename(),
            mime = artifact.mime_type(),
            bytes = artifact.bytes().len(),
            sha256 = %artifact.fingerprint(),
            "Summarizing artifact"
        );

        match format {
            Format::Unsupported => Err(unsupported(&artifact).into()),
            Format::Image => self.summarize_image(&model, artifact).await,
            _ => {
                let document = self.extract(format, artifact).await?;
                self.map_reduce(&model, &document).await
            }
        }
    }

    async fn summarize_image(
        &mut self,
        model: &str,
        artifact: Artifact,
    ) -> Result<SummaryOutcome, PipelineError> {
        if artifact.bytes().is_empty() {
            return Err(ValidationError::EmptyContent {
                format: Format::Image,
            }
            .into());
        }

        let mime = image_mime(artifact.mime_type(), artifact.filename());
        let data_url = format!("data:{mime};base64,{}", STANDARD.encode(artifact.bytes()));
        let request = prompts::image_request(model, &self.service.options.language, data_url);
        let summary = self.complete(PipelineStage::ImageSummary, request).await?;

        Ok(SummaryOutcome {
            summary,
            format: Format::Image,
            chunk_count: 0,
            completion_calls: self.completion_calls,
            reduce_fallback: false,
        })
    }

    async fn extract(
        &mut self,
        format: Format,
        artifact: Artifact,
    ) -> Result<ExtractedDocument, PipelineError> {
        let Some(extractor) = self.service.registry.resolve(format) else {
            return Err(unsupported(&artifact).into());
        };
        let name = extractor.name();
        let bytes = artifact.into_bytes();
        let started = std::time::Instant::now();

        let task = tokio::task::spawn_blocking(move || extractor.extract(&bytes));
        let text = match self.within_deadline(PipelineStage::Extraction, task).await? {
            Ok(result) => result?,
            Err(join_error) => {
                return Err(ExtractionError::corrupt(
                    format,
                    format!("extractor task failed: {join_error}"),
                )
                .into());
            }
        };

        tracing::debug!(
            extractor = name,
            chars = text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Extraction finished"
        );
        Ok(ExtractedDocument::new(format, text)?)
    }

    async fn map_reduce(
        &mut self,
        model: &str,
        document: &ExtractedDocument,
    ) -> Result<SummaryOutcome, PipelineError> {
        let service = self.service;
        let language = service.options.language.as_str();
        let chunks = chunk_text(document.text(), &service.options.chunking)
            .map_err(ConfigurationError::from)?;
        let total = chunks.len();
        tracing::info!(
            chunks = total,
            estimated_tokens = estimate_tokens(document.text()),
            "Planned summarization"
        );

        let mut partials = Vec::with_capacity(total);
        for chunk in &chunks {
            let request = prompts::chunk_request(model, language, chunk.index + 1, total, chunk.text);
            let text = self
                .complete(PipelineStage::ChunkSummary(chunk.index), request)
                .await?;
            partials.push(PartialSummary {
                index: chunk.index,
                text,
            });
        }

        let (summary, reduce_fallback) = if total == 1 {
            (partials.pop().map(|partial| partial.text).unwrap_or_default(), false)
        } else {
            self.reduce(model, partials).await?
        };

        Ok(SummaryOutcome {
            summary,
            format: document.format(),
            chunk_count: total,
            completion_calls: self.completion_calls,
            reduce_fallback,
        })
    }

    /// Merge partial summaries. Returns the summary and whether the fallback was used.
    async fn reduce(
        &mut self,
        model: &str,
        partials: Vec<PartialSummary>,
    ) -> Result<(String, bool), PipelineError> {
        let texts: Vec<String> = partials.into_iter().map(|partial| partial.text).collect();
        let request = prompts::reduce_request(model, &self.service.options.language, &texts);

        match self.complete(PipelineStage::Reduce, request).await {
            Ok(summary) if !summary.trim().is_empty() => Ok((summary, false)),
            Ok(_) => {
                tracing::warn!("Reduce pass returned no content; concatenating partial summaries");
                Ok((texts.join(FALLBACK_SEPARATOR), true))
            }
            Err(PipelineError::Transport(error)) => {
                tracing::warn!(
                    error = %error,
                    "Reduce pass failed; concatenating partial summaries"
                );
                Ok((texts.join(FALLBACK_SEPARATOR), true))
            }
            Err(other) => Err(other),
        }
    }

    async fn complete(
        &mut self,
        stage: PipelineStage,
        request: CompletionRequest,
    ) -> Result<String, PipelineError> {
        let service = self.service;
        self.completion_calls += 1;
        let started = std::time::Instant::now();

        match self
            .within_deadline(stage, service.client.complete(request))
            .await?
        {
            Ok(text) => {
                tracing::debug!(
                    %stage,
                    chars = text.chars().count(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Completion call finished"
                );
                Ok(text)
            }
            Err(error) => {
                tracing::warn!(
                    %stage,
                    status = ?error.status(),
                    error = %error,
                    "Completion call failed"
                );
                Err(error.into())
            }
        }
    }

    async fn within_deadline<F: Future>(
        &self,
        stage: PipelineStage,
        future: F,
    ) -> Result<F::Output, PipelineError> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline.at, future)
                .await
                .map_err(|_| PipelineError::Timeout {
                    deadline: deadline.budget,
                    stage,
                }),
            None => Ok(future.await),
        }
    }
}

fn unsupported(artifact: &Artifact) -> ValidationError {
    ValidationError::UnsupportedFormat {
        filename: artifact.filename().to_string(),
        mime_type: artifact.mime_type().to_string(),
    }
}

/// Mime type for the image data URL: the declared image type, else a guess from the
/// filename, else JPEG.
fn image_mime(declared: &str, filename: &str) -> String {
    let essence = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if essence.starts_with("image/") {
        return essence;
    }
    mime_guess::from_path(filename)
        .first()
        .filter(|guess| guess.type_() == mime_guess::mime::IMAGE)
        .map(|guess| guess.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string())
}

//! HTTP surface for Scammerize.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /api/chat` – Summarize an uploaded file (multipart field `file`). The web front-end
//!   posts here; `POST /summarize` is an alias. An optional `timeout_secs` query parameter overrides
//!   the default deadline. Returns `{ summary, format, chunks, completion_calls, reduce_fallback }`.
//! - `GET /metrics` – Observe summarization counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Failures carry `{ error, classification }` with a status derived from the classification.

use crate::processing::{
    Artifact, ErrorClassification, PipelineError, SummarizeApi, SummarizeRequest,
};
use crate::{extraction::Format, metrics::MetricsSnapshot};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

/// Build the HTTP router exposing the summarization API surface.
///
/// `upload_limit` caps request bodies in bytes; larger uploads are rejected with 413.
pub fn create_router<S>(service: Arc<S>, upload_limit: usize) -> Router
where
    S: SummarizeApi + 'static,
{
    Router::new()
        .route("/api/chat", post(summarize_upload::<S>))
        .route("/summarize", post(summarize_upload::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(service)
}

/// Query parameters accepted by the upload routes.
#[derive(Debug, Default, Deserialize)]
struct SummarizeQuery {
    /// Overall deadline for this request, in seconds.
    #[serde(default)]
    timeout_secs: Option<u64>,
}

/// Success response for the upload routes.
#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
    format: Format,
    chunks: usize,
    completion_calls: usize,
    reduce_fallback: bool,
}

/// Summarize the uploaded file.
///
/// The first `file` part is used; its filename and content type drive format detection. A form
/// without that part is forwarded as a request without an artifact so the pipeline reports it.
async fn summarize_upload<S>(
    State(service): State<Arc<S>>,
    Query(query): Query<SummarizeQuery>,
    mut multipart: Multipart,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: SummarizeApi,
{
    let artifact = read_artifact(&mut multipart).await?;
    let request = SummarizeRequest {
        artifact,
        deadline: query.timeout_secs.map(Duration::from_secs),
    };

    let outcome = service.summarize(request).await?;
    tracing::info!(
        format = %outcome.format,
        chunks = outcome.chunk_count,
        completion_calls = outcome.completion_calls,
        "Upload summarized"
    );
    Ok(Json(SummarizeResponse {
        summary: outcome.summary,
        format: outcome.format,
        chunks: outcome.chunk_count,
        completion_calls: outcome.completion_calls,
        reduce_fallback: outcome.reduce_fallback,
    }))
}

async fn read_artifact(multipart: &mut Multipart) -> Result<Option<Artifact>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        tracing::debug!(
            filename = %filename,
            mime = %mime_type,
            bytes = bytes.len(),
            "Received upload"
        );
        return Ok(Some(Artifact::new(bytes.to_vec(), filename, mime_type)));
    }
    Ok(None)
}

/// Return the summarization counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: SummarizeApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Summarize a PDF, DOCX, PPTX, TXT, or image uploaded as multipart field \"file\". Optional query timeout_secs. Response returns { \"summary\": string, \"format\": \"image\" | \"pdf\" | \"docx\" | \"pptx\" | \"txt\", \"chunks\": number, \"completion_calls\": number, \"reduce_fallback\": bool }.",
            },
            CommandDescriptor {
                name: "chat",
                method: "POST",
                path: "/api/chat",
                description: "Same as summarize; the path used by the web front-end.",
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization counters useful for observability dashboards.",
            },
        ],
    })
}

/// Failure body shared by every route.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    classification: ErrorClassification,
}

enum AppError {
    Pipeline(PipelineError),
    Upload(MultipartError),
}

fn status_for(classification: ErrorClassification) -> StatusCode {
    match classification {
        ErrorClassification::Validation => StatusCode::BAD_REQUEST,
        ErrorClassification::Extraction => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorClassification::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorClassification::Transport => StatusCode::BAD_GATEWAY,
        ErrorClassification::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Pipeline(error) => {
                let classification = error.classification();
                (
                    status_for(classification),
                    ErrorBody {
                        error: error.to_string(),
                        classification,
                    },
                )
            }
            Self::Upload(error) => {
                tracing::warn!(error = %error, "Rejected multipart upload");
                (
                    error.status(),
                    ErrorBody {
                        error: error.body_text(),
                        classification: ErrorClassification::Validation,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Upload(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, create_router, get_commands};
    use crate::completion::CompletionError;
    use crate::extraction::{ExtractionError, Format};
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        ConfigurationError, PipelineError, PipelineStage, SummarizeApi, SummarizeRequest,
        SummaryOutcome, ValidationError,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
        response::IntoResponse,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "scammerize-test-boundary";
    const LIMIT: usize = 1024 * 1024;

    #[tokio::test]
    async fn commands_catalog_exposes_summarize_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let summarize = commands
            .iter()
            .find(|cmd| cmd.name == "summarize")
            .expect("summarize command present");

        assert_eq!(summarize.method, "POST");
        assert_eq!(summarize.path, "/summarize");
        for field in ["summary", "format", "chunks", "completion_calls", "reduce_fallback"] {
            assert!(
                summarize.description.contains(&format!("\"{field}\"")),
                "missing {field}"
            );
        }
        assert!(commands.iter().any(|cmd| cmd.path == "/api/chat"));
    }

    #[tokio::test]
    async fn upload_route_returns_summary_and_forwards_metadata() {
        let service = Arc::new(StubSummarizer::succeeding());
        let app = create_router(service.clone(), LIMIT);

        let response = app
            .oneshot(upload("/summarize?timeout_secs=7", "notes.txt", "text/plain", b"hello"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["summary"], "stub summary");
        assert_eq!(json["format"], "txt");
        assert_eq!(json["chunks"], 1);
        assert_eq!(json["completion_calls"], 1);
        assert_eq!(json["reduce_fallback"], false);

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        let artifact = calls[0].artifact.as_ref().expect("artifact forwarded");
        assert_eq!(artifact.filename(), "notes.txt");
        assert_eq!(artifact.mime_type(), "text/plain");
        assert_eq!(artifact.bytes(), b"hello");
        assert_eq!(calls[0].deadline, Some(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn chat_path_is_an_alias() {
        let service = Arc::new(StubSummarizer::succeeding());
        let app = create_router(service.clone(), LIMIT);

        let response = app
            .oneshot(upload("/api/chat", "slide.png", "image/png", &[1, 2, 3]))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let calls = service.recorded_calls().await;
        assert_eq!(calls[0].deadline, None);
    }

    #[tokio::test]
    async fn form_without_file_is_bad_request() {
        let service = Arc::new(StubSummarizer::succeeding());
        let app = create_router(service, LIMIT);
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n--{BOUNDARY}--\r\n"
        );

        let response = app
            .oneshot(multipart_request("/api/chat", body.into_bytes()))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["classification"], "validation");
        assert!(json["error"].as_str().expect("error text").contains("no file"));
    }

    #[tokio::test]
    async fn pipeline_failure_maps_to_gateway_status() {
        let service = Arc::new(StubSummarizer::failing(|| {
            CompletionError::UnexpectedStatus {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "overloaded".into(),
            }
            .into()
        }));
        let app = create_router(service, LIMIT);

        let response = app
            .oneshot(upload("/summarize", "a.pdf", "application/pdf", b"%PDF-1.4"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = json_body(response).await;
        assert_eq!(json["classification"], "transport");
        assert!(json["error"].as_str().expect("error text").contains("overloaded"));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let service = Arc::new(StubSummarizer::succeeding());
        let app = create_router(service.clone(), 256);

        let response = app
            .oneshot(upload("/summarize", "big.txt", "text/plain", &[b'a'; 4096]))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn metrics_route_serializes_snapshot() {
        let service = Arc::new(StubSummarizer::succeeding());
        let app = create_router(service, LIMIT);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["documents_summarized"], 3);
        assert_eq!(json["reduce_fallbacks"], 1);
    }

    #[test]
    fn classifications_map_to_distinct_statuses() {
        let cases: Vec<(PipelineError, StatusCode)> = vec![
            (
                ConfigurationError::MissingModel.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ValidationError::EmptyContent {
                    format: Format::Docx,
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ExtractionError::Corrupt {
                    format: Format::Pdf,
                    reason: "bad xref".into(),
                }
                .into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CompletionError::UnexpectedStatus {
                    status: reqwest::StatusCode::UNAUTHORIZED,
                    body: "no key".into(),
                }
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PipelineError::Timeout {
                    deadline: Duration::from_secs(30),
                    stage: PipelineStage::Reduce,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (error, expected) in cases {
            let response = AppError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    fn upload(uri: &str, filename: &str, mime: &str, contents: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        multipart_request(uri, body)
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    type Failure = fn() -> PipelineError;

    struct StubSummarizer {
        calls: Arc<Mutex<Vec<SummarizeRequest>>>,
        failure: Option<Failure>,
    }

    impl StubSummarizer {
        fn succeeding() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                failure: None,
            }
        }

        fn failing(failure: Failure) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                failure: Some(failure),
            }
        }

        async fn recorded_calls(&self) -> Vec<SummarizeRequest> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl SummarizeApi for StubSummarizer {
        async fn summarize(
            &self,
            request: SummarizeRequest,
        ) -> Result<SummaryOutcome, PipelineError> {
            let missing = request.artifact.is_none();
            self.calls.lock().await.push(request);
            if missing {
                return Err(ValidationError::MissingArtifact.into());
            }
            if let Some(failure) = self.failure {
                return Err(failure());
            }
            Ok(SummaryOutcome {
                summary: "stub summary".into(),
                format: Format::PlainText,
                chunk_count: 1,
                completion_calls: 1,
                reduce_fallback: false,
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_summarized: 3,
                reduce_fallbacks: 1,
                ..MetricsSnapshot::default()
            }
        }
    }
}

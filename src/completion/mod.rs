//! Boundary abstraction for the remote text/vision completion capability.
//!
//! Every network round trip made by the summarization pipeline goes through
//! [`CompletionClient`]. The HTTP adapter speaks the OpenAI-compatible chat completions
//! protocol; tests substitute in-process stubs.

mod openai;

pub use openai::HttpCompletionClient;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by completion providers.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The request never produced an HTTP response.
    #[error("completion endpoint unreachable: {0}")]
    Http(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("completion endpoint returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the endpoint.
        status: StatusCode,
        /// Raw response body, kept verbatim for diagnostics.
        body: String,
    },
}

impl CompletionError {
    /// HTTP status attached to the failure, when one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http(error) => error.status(),
            Self::UnexpectedStatus { status, .. } => Some(*status),
        }
    }
}

/// Speaker attached to a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the task.
    System,
    /// Caller-provided content.
    User,
    /// Prior model output.
    Assistant,
}

/// One element of a multimodal user message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text fragment.
    Text {
        /// Text payload.
        text: String,
    },
    /// Inline image reference, usually a `data:` URL.
    ImageUrl {
        /// Image location.
        image_url: ImageUrl,
    },
}

/// Location of an image passed to a vision-capable model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    /// `data:<mime>;base64,<payload>` or a fetchable URL.
    pub url: String,
}

/// Content of a chat message: plain text or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Text-only content.
    Text(String),
    /// Mixed text and image parts, in order.
    Parts(Vec<ContentPart>),
}

/// Role-tagged message sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    /// Speaker of the message.
    pub role: Role,
    /// Message body.
    pub content: MessageContent,
}

impl ChatMessage {
    /// System instruction message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Text-only user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Multimodal user message.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }

    /// Concatenated text of the message, ignoring image parts.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Request payload passed to the completion provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Ordered conversation.
    pub messages: Vec<ChatMessage>,
    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Interface implemented by completion backends.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the text of the first completion choice, or an empty string when the provider
    /// produced no content.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Default, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    pub(crate) fn into_first_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default()
    }
}

//! OpenAI-compatible chat completions adapter (Together, OpenAI, vLLM, ...).

use super::{ChatCompletionResponse, CompletionClient, CompletionError, CompletionRequest};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;

/// HTTP client for `POST {base_url}/chat/completions`.
pub struct HttpCompletionClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCompletionClient {
    /// Build a client for the given base URL and optional bearer credential.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, CompletionError> {
        let http = Client::builder().user_agent("scammerize/0.2").build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, CompletionError> {
        let client = Self::new(
            config.completion_base_url.clone(),
            config.completion_api_key.clone(),
        )?;
        tracing::debug!(
            url = %client.endpoint(),
            has_api_key = client.api_key.is_some(),
            "Initialized completion HTTP client"
        );
        Ok(client)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let mut builder = self.http.post(self.endpoint()).json(&request);
        if let Some(key) = self.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CompletionError::UnexpectedStatus { status, body });
        }

        let parsed: ChatCompletionResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    model = %request.model,
                    "Completion response was not valid JSON; treating as empty content"
                );
                ChatCompletionResponse::default()
            }
        };

        Ok(parsed.into_first_content())
    }
}

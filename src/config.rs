use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Default OpenAI-compatible completion endpoint base.
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.together.xyz/v1";
/// Estimated-token ceiling below which a document is summarized in a single call.
pub const DEFAULT_SAFE_TOKEN_THRESHOLD: usize = 80_000;
/// Character window used when a document has to be split.
pub const DEFAULT_CHUNK_CHARS: usize = 15_000;
/// Language requested from the completion model when none is configured.
pub const DEFAULT_SUMMARY_LANGUAGE: &str = "English";
/// Upload ceiling applied by the HTTP surface.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Scammerize service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Completion model identifier; requests fail with a configuration error when absent.
    pub completion_model: Option<String>,
    /// Bearer credential forwarded to the completion endpoint.
    pub completion_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible completion API.
    pub completion_base_url: String,
    /// Estimated-token threshold for the one-shot path.
    pub safe_token_threshold: usize,
    /// Window size, in characters, used when chunking long documents.
    pub chunk_chars: usize,
    /// Language the summaries are written in.
    pub summary_language: String,
    /// Default overall deadline for one summarization request.
    pub summary_deadline: Option<Duration>,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            completion_model: None,
            completion_api_key: None,
            completion_base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
            safe_token_threshold: DEFAULT_SAFE_TOKEN_THRESHOLD,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            summary_language: DEFAULT_SUMMARY_LANGUAGE.to_string(),
            summary_deadline: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            completion_model: load_env_first(&[
                "COMPLETION_MODEL",
                "TOGETHER_MODEL",
                "TOGETHER_GEMMA_MODEL",
            ])
            .map(|value| value.trim().to_string()),
            completion_api_key: load_env_first(&["COMPLETION_API_KEY", "TOGETHER_API_KEY"]),
            completion_base_url: load_env_optional("COMPLETION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_COMPLETION_BASE_URL.to_string()),
            safe_token_threshold: parse_optional("SUMMARY_SAFE_TOKEN_THRESHOLD")?
                .unwrap_or(DEFAULT_SAFE_TOKEN_THRESHOLD),
            chunk_chars: match parse_optional::<usize>("SUMMARY_CHUNK_CHARS")? {
                Some(0) => return Err(ConfigError::InvalidValue("SUMMARY_CHUNK_CHARS".into())),
                Some(value) => value,
                None => DEFAULT_CHUNK_CHARS,
            },
            summary_language: load_env_optional("SUMMARY_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_SUMMARY_LANGUAGE.to_string()),
            summary_deadline: parse_optional::<u64>("SUMMARY_DEADLINE_SECS")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_upload_bytes: parse_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_first(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| load_env_optional(key))
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        base_url = %config.completion_base_url,
        model = ?config.completion_model,
        has_api_key = config.completion_api_key.is_some(),
        safe_token_threshold = config.safe_token_threshold,
        chunk_chars = config.chunk_chars,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.safe_token_threshold, 80_000);
        assert_eq!(config.chunk_chars, 15_000);
        assert_eq!(config.completion_base_url, "https://api.together.xyz/v1");
        assert!(config.completion_model.is_none());
        assert!(config.summary_deadline.is_none());
    }
}

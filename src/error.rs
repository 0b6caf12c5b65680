//! Error types for wordpress-fingerprint

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during fingerprinting and analysis
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid URL provided
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to create HTTP client
    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),

    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    HttpRequest(String),

    /// HTTP response error status
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),

    /// No language-model API key configured
    #[error("language model API key not configured")]
    MissingApiKey,

    /// Language-model API returned an error
    #[error("language model request failed: {message}")]
    LanguageModel {
        /// Upstream status, if a response arrived
        status: Option<u16>,
        /// Upstream message
        message: String,
    },

    /// Language-model API answered without any text
    #[error("language model returned an empty completion")]
    EmptyCompletion,

    /// Server could not bind or serve
    #[error("server failed: {0}")]
    Server(#[source] std::io::Error),

    /// JSON serialization failed
    #[error("JSON serialization failed")]
    SerializationFailed(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure is transient and the operation may be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpRequest(_) => true,
            Self::LanguageModel {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            Self::LanguageModel { status: None, .. } => true,
            _ => false,
        }
    }
}

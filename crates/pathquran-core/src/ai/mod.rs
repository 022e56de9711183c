pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use reqwest::StatusCode;
use thiserror::Error;

/// Why a completion request produced no text.
///
/// Rate limiting is its own case so front-ends can alert on it instead of
/// showing it inline.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("API limit exceeded. Try again later.")]
    RateLimited,

    #[error("No internet connection. Please check your network and try again.")]
    Network(#[source] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0} API key not configured")]
    MissingApiKey(&'static str),

    #[error("Unexpected response from provider: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl CompletionError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CompletionError::RateLimited)
    }

    /// Classify a failed `send()`. Only connect and timeout failures mean the
    /// network is unreachable.
    pub fn from_send(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            CompletionError::Network(error)
        } else if error.is_decode() {
            CompletionError::Decode(error)
        } else {
            CompletionError::Request(error)
        }
    }

    /// Map a non-success response to an error, using the provider's
    /// `error.message` when the body carries one.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return CompletionError::RateLimited;
        }

        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                let error = value.get("error")?;
                error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .or_else(|| error.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "An unknown error occurred.".to_string());

        CompletionError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

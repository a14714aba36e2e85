//! Language-Model Gateway: the single seam between the pipeline and the completion endpoint.
//!
//! Every prompt in the service flows through [`Gateway::complete`]. The Ollama-backed client
//! issues one blocking `POST /api/generate` per call with a long timeout suited to local
//! inference and never retries. Callers always get a string on success, even when the
//! response envelope lacks the expected text field.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Response envelope fields that may carry the generated text, checked in order.
const ANSWER_FIELDS: [&str; 2] = ["response", "output"];
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Errors surfaced by the completion endpoint.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The endpoint could not be reached or the call timed out.
    #[error("Completion endpoint unreachable: {0}")]
    Unreachable(String),
    /// The endpoint answered with a non-success status.
    #[error("Completion endpoint returned {status}: {body}")]
    UpstreamStatus {
        /// HTTP status code returned upstream.
        status: u16,
        /// Sanitized, truncated response body.
        body: String,
    },
    /// A success response whose body was not JSON.
    #[error("Malformed completion response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Upstream HTTP status code, when the endpoint produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Interface implemented by text-completion backends.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete `prompt` with the given model and return the generated text.
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, GatewayError>;
}

/// Shared handle pairing a completion client with the configured model.
///
/// Constructed once at startup and cloned into every service that needs the model.
#[derive(Clone)]
pub struct Gateway {
    client: Arc<dyn CompletionClient>,
    model: String,
}

impl Gateway {
    /// Wrap an arbitrary completion client.
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Build the Ollama-backed gateway described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let client = OllamaCompletionClient::new(&config.ollama_url, config.gateway_timeout())?;
        tracing::debug!(
            url = %config.ollama_url,
            model = %config.ollama_model,
            timeout_secs = config.gateway_timeout_secs,
            "Initialized completion gateway"
        );
        Ok(Self::new(Arc::new(client), config.ollama_model.clone()))
    }

    /// Complete a prompt with the configured model.
    pub async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let model = self.model.as_str();
        tracing::debug!(model, prompt_chars = prompt.chars().count(), "Requesting completion");
        let result = self.client.complete(prompt, model).await;
        if let Err(error) = &result {
            tracing::warn!(model, status = ?error.status(), error = %error, "Completion failed");
        }
        result
    }
}

/// Completion client speaking the Ollama `/api/generate` protocol.
pub struct OllamaCompletionClient {
    http: Client,
    base_url: String,
}

impl OllamaCompletionClient {
    /// Build a client for `base_url` with a per-call timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .user_agent("docsense/0.1")
            .timeout(timeout)
            .build()
            .map_err(|error| {
                GatewayError::Unreachable(format!("failed to construct HTTP client: {error}"))
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OllamaCompletionClient {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, GatewayError> {
        let payload = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                let reason = if error.is_timeout() {
                    "request timed out"
                } else {
                    "request failed"
                };
                GatewayError::Unreachable(format!("{reason} for {}: {error}", self.base_url))
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|error| {
            GatewayError::Unreachable(format!("failed to read response body: {error}"))
        })?;

        if !status.is_success() {
            return Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                body: sanitize_body(&bytes),
            });
        }

        let body: Value = serde_json::from_slice(&bytes).map_err(|error| {
            GatewayError::InvalidResponse(format!("response body is not JSON: {error}"))
        })?;

        Ok(extract_answer(&body))
    }
}

/// Pull the generated text out of a response envelope.
///
/// Falls back to the serialized envelope when no known field carries text.
pub(crate) fn extract_answer(body: &Value) -> String {
    for field in ANSWER_FIELDS {
        match body.get(field) {
            None | Some(Value::Null) => continue,
            Some(Value::String(text)) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
            Some(other) => return other.to_string(),
        }
    }
    tracing::debug!("Completion envelope lacked a text field; returning serialized body");
    body.to_string()
}

/// Render an error body as printable, bounded text.
fn sanitize_body(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let printable: String = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    printable.trim().to_string()
}

//! Generative-model capability used as a fallback for query entity extraction.
//!
//! The provider is optional; when no model is configured the extractor simply relies on its
//! pattern rules. The Ollama-backed client issues HTTP requests directly to the runtime.

use crate::config::get_config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors surfaced while attempting generative extraction.
#[derive(Debug, Error)]
pub enum GenerativeClientError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Generative provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by generative-text providers.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Generate a completion for `prompt` using the configured model.
    async fn generate(&self, prompt: String) -> Result<String, GenerativeClientError>;
}

/// Build a generative client based on configuration, if a model is configured.
pub fn get_generative_client() -> Option<Box<dyn GenerativeClient + Send + Sync>> {
    let config = get_config();
    let model = config.generative_model.clone()?;
    let base_url = config
        .ollama_url
        .clone()
        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
    Some(Box::new(OllamaGenerativeClient::new(base_url, model)))
}

struct OllamaGenerativeClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerativeClient {
    fn new(base_url: String, model: String) -> Self {
        let http = Client::builder()
            .user_agent("clausewise/generative")
            .build()
            .expect("Failed to construct reqwest::Client for generative extraction");
        Self {
            http,
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GenerativeClient for OllamaGenerativeClient {
    async fn generate(&self, prompt: String) -> Result<String, GenerativeClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                // Lower temperature for deterministic structured extraction.
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerativeClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerativeClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerativeClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GenerativeClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(GenerativeClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

/// Extract the first embedded JSON object from a model completion.
///
/// Models frequently wrap the requested object in prose or code fences; this scans for the
/// first balanced `{...}` span that parses as an object. Returns `None` when nothing parses,
/// which callers treat as "no extraction".
pub fn extract_json_object(completion: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    let bytes = completion.as_bytes();
    let start = completion.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &completion[start..=start + offset];
                    return match serde_json::from_str::<serde_json::Value>(candidate) {
                        Ok(serde_json::Value::Object(map)) => Some(map),
                        _ => None,
                    };
                }
            }
            _ => {}
        }
    }
    None
}

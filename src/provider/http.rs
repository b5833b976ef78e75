//! Stateless HTTP providers: one request per turn, no session
//!
//! Missing API keys fail at construction. Request bodies are built by plain
//! functions so they can be checked without a network.

use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

use crate::error::{OrchestratorError, Result};
use crate::types::messages::ChatMessage;

use super::Provider;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f64 = 0.2;

fn require_key(name: &str, key: Option<String>) -> Result<String> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(OrchestratorError::missing_credential(name)),
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| OrchestratorError::invalid_config(format!("HTTP client: {e}")))
}

fn network_error(e: reqwest::Error) -> OrchestratorError {
    if e.is_timeout() {
        OrchestratorError::timeout(e.to_string())
    } else {
        OrchestratorError::connection(format!("Network error: {e}"))
    }
}

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl AnthropicProvider {
    /// Create a provider
    ///
    /// # Errors
    /// Returns `MissingCredential` for an absent or blank key
    pub fn new(api_key: Option<String>, model: Option<String>) -> Result<Self> {
        Ok(Self {
            api_key: require_key("ANTHROPIC_API_KEY", api_key)?,
            model: model.unwrap_or_else(|| ANTHROPIC_DEFAULT_MODEL.to_string()),
            base_url: ANTHROPIC_API_URL.to_string(),
            client: build_client()?,
        })
    }

    /// Point at a different endpoint
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Request body for one turn
    #[must_use]
    pub fn request_body(&self, system: &str, history: &[ChatMessage]) -> Value {
        let messages: Vec<Value> = history
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();
        let mut body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "messages": messages,
        });
        if !system.is_empty() {
            body["system"] = json!(system);
        }
        body
    }

    async fn complete(&self, system: &str, history: &[ChatMessage]) -> Result<String> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(system, history))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OrchestratorError::provider(format!(
                "Anthropic API error {status}: {error_text}"
            )));
        }

        let raw: Value = response.json().await.map_err(network_error)?;
        Ok(anthropic_text(&raw))
    }
}

/// First text block of a Messages API response
#[must_use]
pub fn anthropic_text(raw: &Value) -> String {
    raw["content"]
        .as_array()
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|b| b["type"].as_str() == Some("text"))
                .and_then(|b| b["text"].as_str())
        })
        .unwrap_or_default()
        .to_string()
}

impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn generate<'a>(
        &'a self,
        system: &'a str,
        history: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.complete(system, history))
    }
}

/// OpenAI chat completions provider
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl OpenAiProvider {
    /// Create a provider
    ///
    /// # Errors
    /// Returns `MissingCredential` for an absent or blank key
    pub fn new(api_key: Option<String>, model: Option<String>) -> Result<Self> {
        Ok(Self {
            api_key: require_key("OPENAI_API_KEY", api_key)?,
            model: model.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            base_url: OPENAI_API_URL.to_string(),
            client: build_client()?,
        })
    }

    /// Point at a different endpoint
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Request body for one turn; the system prompt leads the message list
    #[must_use]
    pub fn request_body(&self, system: &str, history: &[ChatMessage]) -> Value {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !system.is_empty() {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.extend(
            history
                .iter()
                .map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
        );
        json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": messages,
        })
    }

    async fn complete(&self, system: &str, history: &[ChatMessage]) -> Result<String> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(system, history))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OrchestratorError::provider(format!(
                "OpenAI API error {status}: {error_text}"
            )));
        }

        let raw: Value = response.json().await.map_err(network_error)?;
        Ok(raw["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn generate<'a>(
        &'a self,
        system: &'a str,
        history: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.complete(system, history))
    }
}

//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing the
//! `/v1/chat/completions` contract. The orchestrator sends the
//! assembled instructions as the system message and the history window
//! as the remaining messages; the provider returns the first choice's
//! content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use bia_core::error::ProviderError;
use bia_core::provider::Provider;
use bia_core::types::{ChatTurn, Role};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// An OpenAI-compatible completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider. `api_key` may be absent at construction;
    /// the first `complete()` call fails with `NotConfigured` instead
    /// of crashing the process at startup.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: Option<String>) -> Self {
        Self::new("openai", DEFAULT_BASE_URL, api_key)
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("OPENAI_API_KEY is not set".into())
        })
    }

    /// Convert instructions + history to the wire message format.
    fn to_api_messages(instructions: &str, history: &[ChatTurn]) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ApiMessage {
            role: "system".into(),
            content: Some(instructions.to_string()),
        });
        messages.extend(history.iter().map(|turn| ApiMessage {
            role: match turn.role {
                Role::User => "user".into(),
                Role::Assistant => "assistant".into(),
            },
            content: Some(turn.content.clone()),
        }));
        messages
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        model: &str,
        instructions: &str,
        history: &[ChatTurn],
    ) -> Result<String, ProviderError> {
        let api_key = self.key()?;
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": model,
            "messages": Self::to_api_messages(instructions, history),
        });

        debug!(provider = %self.name, model, turns = history.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited);
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let Ok(api_key) = self.key() else {
            return Ok(false);
        };
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

//! OpenAI client, also the wire format for other OpenAI-compatible
//! servers.

use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::ai::error::ProviderError;
use crate::ai::prompt::{system_prompt, Purpose};
use crate::ai::{GenerationRequest, GenerationResponse};
use crate::config::OpenAiSettings;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Chat-completions request body, shared with LM Studio.
#[derive(Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One chat message.
#[derive(Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// Chat-completions response body, shared with LM Studio.
#[derive(Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<serde_json::Value>,
}

/// One completion choice.
#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The message within a completion choice.
#[derive(Deserialize)]
pub(crate) struct ChatChoiceMessage {
    pub content: String,
}

/// Client for the OpenAI chat completions API.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    settings: OpenAiSettings,
}

impl OpenAiClient {
    /// Creates a client, resolving the API key from settings or the
    /// OPENAI_API_KEY environment variable.
    pub fn new(settings: OpenAiSettings) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .ok_or(ProviderError::ApiKeyMissing {
                provider: "OpenAI",
                env_var: "OPENAI_API_KEY",
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .build()
            .expect("failed to build HTTP client");
        let base_url = settings.base_url.trim_end_matches('/').to_string();

        debug!(base_url = %base_url, model = %settings.model, "OpenAiClient initialized");

        Ok(Self {
            client,
            base_url,
            api_key,
            settings,
        })
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Whether the models endpoint answers with this key.
    pub async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    /// Models the API advertises; falls back to the configured model.
    pub async fn available_models(&self) -> Vec<String> {
        #[derive(Deserialize)]
        struct ModelsResponse {
            #[serde(default)]
            data: Vec<ModelEntry>,
        }
        #[derive(Deserialize)]
        struct ModelEntry {
            id: String,
        }

        let fetched = async {
            let response = self
                .client
                .get(format!("{}/models", self.base_url))
                .bearer_auth(&self.api_key)
                .send()
                .await
                .ok()?;
            let models: ModelsResponse = response.json().await.ok()?;
            Some(models.data.into_iter().map(|m| m.id).collect::<Vec<_>>())
        }
        .await;

        match fetched {
            Some(models) if !models.is_empty() => models,
            _ => vec![self.settings.model.clone()],
        }
    }

    /// Sends one generation request.
    pub async fn generate(
        &self,
        prompt: &str,
        request: &GenerationRequest,
        purpose: Purpose,
    ) -> Result<GenerationResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(&self.settings.model);
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(purpose),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: request.temperature.or(Some(self.settings.temperature)),
            max_tokens: request.max_tokens.or(self.settings.max_tokens),
        };

        info!(model = %model, prompt_length = prompt.len(), "Generating content with OpenAI");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_http("OpenAI", self.settings.timeout, &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(format!("HTTP {status}: {text}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .first()
            .ok_or(ProviderError::EmptyResponse("OpenAI"))?;
        let content = choice.message.content.trim().to_string();
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse("OpenAI"));
        }

        let tokens_used = parsed
            .usage
            .as_ref()
            .and_then(|u| u.get("total_tokens"))
            .and_then(serde_json::Value::as_u64);

        let mut metadata = serde_json::Map::new();
        metadata.insert("usage".to_string(), json!(&parsed.usage));
        metadata.insert("finish_reason".to_string(), json!(&choice.finish_reason));

        Ok(GenerationResponse {
            content,
            model_used: model.to_string(),
            tokens_used,
            metadata,
        })
    }
}

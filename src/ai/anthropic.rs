//! Anthropic Claude API client.

use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::ai::error::ProviderError;
use crate::ai::prompt::{system_prompt, Purpose};
use crate::ai::{GenerationRequest, GenerationResponse};
use crate::config::AnthropicSettings;

const API_VERSION: &str = "2023-06-01";
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Tokens requested by the health-check probe message.
const HEALTH_CHECK_MAX_TOKENS: u32 = 10;

/// Output budget when neither config nor request sets one; the API
/// requires an explicit value.
const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

/// Client for the Anthropic messages API.
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    settings: AnthropicSettings,
}

impl AnthropicClient {
    /// Creates a client, resolving the API key from settings or the
    /// ANTHROPIC_API_KEY environment variable.
    pub fn new(settings: AnthropicSettings) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| env::var("ANTHROPIC_API_KEY").ok())
            .ok_or(ProviderError::ApiKeyMissing {
                provider: "Anthropic",
                env_var: "ANTHROPIC_API_KEY",
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .build()
            .expect("failed to build HTTP client");
        let base_url = settings.base_url.trim_end_matches('/').to_string();

        debug!(base_url = %base_url, model = %settings.model, "AnthropicClient initialized");

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

    fn request_builder(&self, url: String) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
    }

    /// Probes the API with a minimal message.
    pub async fn health_check(&self) -> bool {
        let probe = MessagesRequest {
            model: &self.settings.model,
            max_tokens: HEALTH_CHECK_MAX_TOKENS,
            temperature: None,
            system: None,
            messages: vec![Message {
                role: "user",
                content: "Hello",
            }],
        };

        self.request_builder(format!("{}/messages", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .json(&probe)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    /// Known Claude models; the messages API has no listing endpoint.
    pub fn available_models(&self) -> Vec<String> {
        vec![
            "claude-3-5-sonnet-20240620".to_string(),
            "claude-3-opus-20240229".to_string(),
            "claude-3-sonnet-20240229".to_string(),
            "claude-3-haiku-20240307".to_string(),
        ]
    }

    /// Sends one generation request.
    pub async fn generate(
        &self,
        prompt: &str,
        request: &GenerationRequest,
        purpose: Purpose,
    ) -> Result<GenerationResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(&self.settings.model);
        let body = MessagesRequest {
            model,
            max_tokens: request
                .max_tokens
                .or(self.settings.max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature.or(Some(self.settings.temperature)),
            system: Some(system_prompt(purpose)),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        info!(model = %model, prompt_length = prompt.len(), "Generating content with Anthropic");

        let response = self
            .request_builder(format!("{}/messages", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_http("Anthropic", self.settings.timeout, &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(format!("HTTP {status}: {text}")));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let block = parsed
            .content
            .first()
            .filter(|block| block.block_type == "text")
            .ok_or_else(|| {
                ProviderError::InvalidResponse("No text content in response".to_string())
            })?;

        let content = block.text.trim().to_string();
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse("Anthropic"));
        }

        let tokens_used = parsed
            .usage
            .as_ref()
            .and_then(|u| u.get("output_tokens"))
            .and_then(serde_json::Value::as_u64);

        let mut metadata = serde_json::Map::new();
        metadata.insert("usage".to_string(), json!(&parsed.usage));
        metadata.insert("stop_reason".to_string(), json!(&parsed.stop_reason));

        Ok(GenerationResponse {
            content,
            model_used: model.to_string(),
            tokens_used,
            metadata,
        })
    }
}

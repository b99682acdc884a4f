//! LM Studio client (local OpenAI-compatible server).

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::ai::error::ProviderError;
use crate::ai::openai::{ChatMessage, ChatRequest, ChatResponse};
use crate::ai::prompt::{system_prompt, Purpose};
use crate::ai::{GenerationRequest, GenerationResponse};
use crate::config::LmStudioSettings;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for LM Studio's local server, which speaks the OpenAI chat
/// completions protocol without authentication.
pub struct LmStudioClient {
    client: Client,
    base_url: String,
    settings: LmStudioSettings,
}

impl LmStudioClient {
    /// Creates a client from settings.
    pub fn new(settings: LmStudioSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .build()
            .expect("failed to build HTTP client");
        let base_url = settings.base_url.trim_end_matches('/').to_string();

        debug!(base_url = %base_url, model = %settings.model, "LmStudioClient initialized");

        Self {
            client,
            base_url,
            settings,
        }
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Whether the local server responds to its models endpoint.
    pub async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/models", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    /// Models the server has loaded; falls back to the configured model.
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

        info!(model = %model, prompt_length = prompt.len(), "Generating content with LM Studio");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_http("LM Studio", self.settings.timeout, &e))?;

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
            .ok_or(ProviderError::EmptyResponse("LM Studio"))?;
        let content = choice.message.content.trim().to_string();
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse("LM Studio"));
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> LmStudioSettings {
        LmStudioSettings {
            base_url: server.uri(),
            model: "local-model".to_string(),
            timeout: 5,
            temperature: 0.7,
            max_tokens: Some(1000),
        }
    }

    #[tokio::test]
    async fn generate_speaks_openai_protocol() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "chore: bump deps"}}],
            })))
            .mount(&server)
            .await;

        let client = LmStudioClient::new(settings_for(&server));
        let request = GenerationRequest {
            prompt: "generate".to_string(),
            context: Map::new(),
            max_tokens: None,
            temperature: None,
            model: None,
        };
        let response = client
            .generate("prompt", &request, Purpose::Commit)
            .await
            .expect("generate");
        assert_eq!(response.content, "chore: bump deps");
        assert_eq!(response.model_used, "local-model");
    }
}

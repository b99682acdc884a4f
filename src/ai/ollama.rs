//! Ollama client for local model generation.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::ai::error::ProviderError;
use crate::ai::{GenerationRequest, GenerationResponse};
use crate::config::OllamaSettings;

/// Timeout for the lightweight availability probe.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    eval_count: Option<u64>,
    eval_duration: Option<u64>,
    total_duration: Option<u64>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

/// Client for Ollama's HTTP API.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    settings: OllamaSettings,
}

impl OllamaClient {
    /// Creates a client from settings.
    pub fn new(settings: OllamaSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .build()
            .expect("failed to build HTTP client");
        let base_url = settings.base_url.trim_end_matches('/').to_string();

        debug!(base_url = %base_url, model = %settings.model, "OllamaClient initialized");

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

    /// Whether the server responds to its tags endpoint.
    pub async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    /// Models the server advertises; falls back to the configured model.
    pub async fn available_models(&self) -> Vec<String> {
        let fetched = async {
            let response = self
                .client
                .get(format!("{}/api/tags", self.base_url))
                .send()
                .await
                .ok()?;
            let tags: TagsResponse = response.json().await.ok()?;
            Some(tags.models.into_iter().map(|m| m.name).collect::<Vec<_>>())
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
    ) -> Result<GenerationResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(&self.settings.model);
        let max_tokens = request.max_tokens.or(self.settings.max_tokens);
        let temperature = request.temperature.or(Some(self.settings.temperature));

        let options = (max_tokens.is_some() || temperature.is_some()).then_some(OllamaOptions {
            num_predict: max_tokens,
            temperature,
        });

        let body = OllamaRequest {
            model,
            prompt,
            stream: false,
            options,
        };

        info!(model = %model, prompt_length = prompt.len(), "Generating content with Ollama");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_http("Ollama", self.settings.timeout, &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(format!("HTTP {status}: {text}")));
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = parsed.response.trim().to_string();
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse("Ollama"));
        }

        let mut metadata = serde_json::Map::new();
        metadata.insert("eval_duration".to_string(), json!(parsed.eval_duration));
        metadata.insert("total_duration".to_string(), json!(parsed.total_duration));

        Ok(GenerationResponse {
            content,
            model_used: model.to_string(),
            tokens_used: parsed.eval_count,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> OllamaSettings {
        OllamaSettings {
            base_url: server.uri(),
            model: "qwen2.5:7b".to_string(),
            timeout: 5,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "generate".to_string(),
            context: Map::new(),
            max_tokens: None,
            temperature: None,
            model: None,
        }
    }

    #[tokio::test]
    async fn health_check_true_when_tags_respond() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "qwen2.5:7b"}]
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(settings_for(&server));
        assert!(client.health_check().await);
        assert_eq!(client.available_models().await, vec!["qwen2.5:7b"]);
    }

    #[tokio::test]
    async fn health_check_false_when_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = OllamaClient::new(settings_for(&server));
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn generate_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "qwen2.5:7b",
                "stream": false,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "feat(core): add analyzer\n",
                "eval_count": 42,
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(settings_for(&server));
        let response = client.generate("prompt", &request()).await.expect("generate");
        assert_eq!(response.content, "feat(core): add analyzer");
        assert_eq!(response.model_used, "qwen2.5:7b");
        assert_eq!(response.tokens_used, Some(42));
    }

    #[tokio::test]
    async fn generate_rejects_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "   "})),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(settings_for(&server));
        let err = client
            .generate("prompt", &request())
            .await
            .expect_err("must fail");
        assert!(matches!(err, ProviderError::EmptyResponse("Ollama")));
    }

    #[tokio::test]
    async fn generate_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(settings_for(&server));
        let err = client
            .generate("prompt", &request())
            .await
            .expect_err("must fail");
        assert!(matches!(err, ProviderError::RequestFailed(_)));
    }
}

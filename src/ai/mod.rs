//! Generation providers and their unified selection interface.
//!
//! Each back-end is one enum variant; selection happens through the
//! name-keyed registry in [`Provider::create`], not through trait
//! objects.

pub mod anthropic;
pub mod error;
pub mod lmstudio;
pub mod ollama;
pub mod openai;
pub mod prompt;

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::GitAiConfig;

pub use anthropic::AnthropicClient;
pub use error::ProviderError;
pub use lmstudio::LmStudioClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use prompt::Purpose;

/// Registered provider names.
pub const PROVIDER_NAMES: [&str; 4] = ["ollama", "openai", "anthropic", "lmstudio"];

/// Attempts per generation request.
const MAX_RETRIES: u32 = 3;

/// Base delay between attempts; grows linearly with the attempt number.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// A request for generated text.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The rendered template to send.
    pub prompt: String,
    /// Analysis context appended as a digest and available to providers.
    pub context: Map<String, Value>,
    /// Override for the configured token budget.
    pub max_tokens: Option<u32>,
    /// Override for the configured temperature.
    pub temperature: Option<f64>,
    /// Override for the configured model.
    pub model: Option<String>,
}

impl GenerationRequest {
    /// A request with no per-call overrides.
    pub fn new(prompt: String, context: Map<String, Value>) -> Self {
        Self {
            prompt,
            context,
            max_tokens: None,
            temperature: None,
            model: None,
        }
    }
}

/// Generated text plus provenance.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// The generated content, trimmed.
    pub content: String,
    /// Model that produced the content.
    pub model_used: String,
    /// Tokens consumed, when the back-end reports them.
    pub tokens_used: Option<u64>,
    /// Back-end specific response metadata.
    pub metadata: Map<String, Value>,
}

/// A configured generation back-end.
pub enum Provider {
    /// Local Ollama server.
    Ollama(OllamaClient),
    /// OpenAI API.
    OpenAi(OpenAiClient),
    /// Anthropic API.
    Anthropic(AnthropicClient),
    /// Local LM Studio server.
    LmStudio(LmStudioClient),
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ollama(_) => "Ollama",
            Self::OpenAi(_) => "OpenAi",
            Self::Anthropic(_) => "Anthropic",
            Self::LmStudio(_) => "LmStudio",
        };
        f.debug_tuple(name).finish()
    }
}

impl Provider {
    /// Creates a provider by registry name using its configured
    /// settings.
    pub fn create(name: &str, config: &GitAiConfig) -> Result<Self, ProviderError> {
        match name {
            "ollama" => Ok(Self::Ollama(OllamaClient::new(
                config.ollama.clone().unwrap_or_default(),
            ))),
            "openai" => Ok(Self::OpenAi(OpenAiClient::new(
                config.openai.clone().unwrap_or_default(),
            )?)),
            "anthropic" => Ok(Self::Anthropic(AnthropicClient::new(
                config.anthropic.clone().unwrap_or_default(),
            )?)),
            "lmstudio" => Ok(Self::LmStudio(LmStudioClient::new(
                config.lmstudio.clone().unwrap_or_default(),
            ))),
            _ => Err(ProviderError::NotRegistered {
                name: name.to_string(),
                available: PROVIDER_NAMES.join(", "),
            }),
        }
    }

    /// Creates the named provider, falling back through the other
    /// enabled providers when it is unhealthy.
    pub async fn create_with_fallback(
        primary: &str,
        config: &GitAiConfig,
    ) -> Result<Self, ProviderError> {
        match Self::create(primary, config) {
            Ok(provider) => {
                if provider.health_check().await {
                    return Ok(provider);
                }
                warn!("Primary provider {primary} failed health check");
            }
            Err(e) => warn!("Primary provider {primary} failed: {e}"),
        }

        for name in config.enabled_providers() {
            if name == primary {
                continue;
            }
            match Self::create(&name, config) {
                Ok(provider) => {
                    if provider.health_check().await {
                        info!("Using fallback provider: {name}");
                        return Ok(provider);
                    }
                    warn!("Fallback provider {name} failed health check");
                }
                Err(e) => warn!("Fallback provider {name} failed: {e}"),
            }
        }

        Err(ProviderError::NoHealthyProvider)
    }

    /// Registry name of this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ollama(_) => "ollama",
            Self::OpenAi(_) => "openai",
            Self::Anthropic(_) => "anthropic",
            Self::LmStudio(_) => "lmstudio",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::Ollama(_) => "Ollama",
            Self::OpenAi(_) => "OpenAI",
            Self::Anthropic(_) => "Anthropic",
            Self::LmStudio(_) => "LM Studio",
        }
    }

    /// The model this provider will use by default.
    pub fn model(&self) -> String {
        match self {
            Self::Ollama(client) => client.model().to_string(),
            Self::OpenAi(client) => client.model().to_string(),
            Self::Anthropic(client) => client.model().to_string(),
            Self::LmStudio(client) => client.model().to_string(),
        }
    }

    /// Whether the back-end is reachable and responsive.
    pub async fn health_check(&self) -> bool {
        match self {
            Self::Ollama(client) => client.health_check().await,
            Self::OpenAi(client) => client.health_check().await,
            Self::Anthropic(client) => client.health_check().await,
            Self::LmStudio(client) => client.health_check().await,
        }
    }

    /// Models the back-end offers, best-effort.
    pub async fn available_models(&self) -> Vec<String> {
        match self {
            Self::Ollama(client) => client.available_models().await,
            Self::OpenAi(client) => client.available_models().await,
            Self::Anthropic(client) => client.available_models(),
            Self::LmStudio(client) => client.available_models().await,
        }
    }

    /// Generates text for the request, retrying transient failures.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        purpose: Purpose,
    ) -> Result<GenerationResponse, ProviderError> {
        if !self.health_check().await {
            return Err(ProviderError::Unavailable(self.display_name().to_string()));
        }

        let final_prompt = prompt::compose_prompt(&request.prompt, &request.context);

        let mut last_error = None;
        for attempt in 1..=MAX_RETRIES {
            match self.dispatch(&final_prompt, request, purpose).await {
                Ok(response) => {
                    info!(
                        provider = self.name(),
                        model = %response.model_used,
                        content_length = response.content.len(),
                        "Content generated successfully"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!(provider = self.name(), attempt, "Generation attempt failed: {e}");
                    last_error = Some(e);
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::RequestFailed("Generation failed after all retries".to_string())
        }))
    }

    async fn dispatch(
        &self,
        prompt: &str,
        request: &GenerationRequest,
        purpose: Purpose,
    ) -> Result<GenerationResponse, ProviderError> {
        match self {
            Self::Ollama(client) => client.generate(prompt, request).await,
            Self::OpenAi(client) => client.generate(prompt, request, purpose).await,
            Self::Anthropic(client) => client.generate(prompt, request, purpose).await,
            Self::LmStudio(client) => client.generate(prompt, request, purpose).await,
        }
    }
}

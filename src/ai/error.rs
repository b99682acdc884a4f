//! Provider-specific error handling.

use thiserror::Error;

/// Errors from the generation providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The requested provider name is not in the registry.
    #[error("Provider '{name}' not available. Available providers: {available}")]
    NotRegistered {
        /// The requested name.
        name: String,
        /// Comma-separated registered names.
        available: String,
    },

    /// A required API key was neither configured nor in the environment.
    #[error("{provider} API key is required. Set {env_var} or provide api_key in config")]
    ApiKeyMissing {
        /// Provider display name.
        provider: &'static str,
        /// Environment variable checked.
        env_var: &'static str,
    },

    /// The provider did not pass its health check.
    #[error("{0} is not available or not responding")]
    Unavailable(String),

    /// Neither the requested provider nor any fallback passed its health
    /// check.
    #[error("No healthy providers available")]
    NoHealthyProvider,

    /// The request exceeded the configured timeout.
    #[error("{provider} request timed out after {seconds}s")]
    Timeout {
        /// Provider display name.
        provider: &'static str,
        /// Configured timeout in seconds.
        seconds: u64,
    },

    /// The HTTP request failed or returned a non-success status.
    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    /// The response body did not match the provider's wire format.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// The provider returned no usable content.
    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),
}

impl ProviderError {
    /// Maps a reqwest error onto the taxonomy, keeping timeouts distinct.
    pub fn from_http(provider: &'static str, seconds: u64, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout { provider, seconds }
        } else if error.is_connect() {
            Self::Unavailable(provider.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

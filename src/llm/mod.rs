//! Language-model integration.
//!
//! The onboarding flow treats the model as an opaque text-completion oracle
//! reached through a single OpenAI-compatible `chat/completions` call. The
//! `LlmProvider` trait is the seam tests use to inject stub providers.

pub mod openai;
pub mod provider;

pub use openai::OpenAiCompatibleProvider;
pub use provider::*;

use std::sync::Arc;
use std::time::Duration;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the model service, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Path appended to `base_url`.
    pub api_path: String,
    pub model: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<secrecy::SecretString>,
    /// Whole-request timeout. Exceeding it is an ordinary failure.
    pub timeout: Duration,
    /// Fetch a Google Cloud identity token per call when set.
    pub identity: Option<IdentityConfig>,
}

/// GCP metadata server endpoint that mints identity tokens.
pub const GCP_IDENTITY_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/identity";

/// Identity-token settings for a protected (e.g. Cloud Run) model service.
///
/// The token replaces the API key as the bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub audience: String,
    pub token_url: String,
}

impl IdentityConfig {
    /// Tokens from the GCP metadata server for `audience`.
    pub fn gcp(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            token_url: GCP_IDENTITY_TOKEN_URL.to_string(),
        }
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = OpenAiCompatibleProvider::new(config)?;
    tracing::info!(
        model = %config.model,
        endpoint = %provider.endpoint(),
        timeout_ms = config.timeout.as_millis() as u64,
        identity_audience = ?config.identity.as_ref().map(|i| i.audience.as_str()),
        "Using OpenAI-compatible model service"
    );
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_without_key_still_constructs() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_path: "/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout: Duration::from_secs(15),
            identity: None,
        };
        let provider = create_provider(&config);
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().model_name(), "gpt-4o-mini");
    }
}

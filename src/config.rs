//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::llm::{IdentityConfig, LlmConfig};
use crate::session::EvictionPolicy;

/// Default number of stored history entries per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Default number of stored history entries replayed to the model.
pub const DEFAULT_PROMPT_HISTORY: usize = 12;

/// Default language-model request timeout.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(15);

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Language-model endpoint and credentials.
    pub llm: LlmConfig,
    /// When set, chat responses carry a `debug` block.
    pub debug_mode: bool,
    /// Markdown document the knowledge index is built from.
    pub knowledge_path: PathBuf,
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
    /// Session store eviction policy.
    pub session_eviction: EvictionPolicy,
    /// Maximum stored history entries per session (oldest dropped first).
    pub history_limit: usize,
    /// Number of most recent history entries sent to the model.
    pub prompt_history: usize,
}

impl AppConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let base_url = required("LLM_API_BASE_URL")?;
        let model = required("LLM_MODEL_NAME")?;
        let api_path =
            lookup("LLM_API_PATH").unwrap_or_else(|| "/v1/chat/completions".to_string());
        let api_key = lookup("LLM_API_KEY")
            .filter(|k| !k.is_empty())
            .map(secrecy::SecretString::from);

        let timeout = match lookup("LLM_TIMEOUT_SECS") {
            Some(raw) => parse_timeout("LLM_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_LLM_TIMEOUT,
        };

        let identity = lookup("LLM_IDENTITY_AUDIENCE")
            .filter(|a| !a.trim().is_empty())
            .map(|audience| {
                let mut identity = IdentityConfig::gcp(audience.trim());
                if let Some(url) = lookup("LLM_IDENTITY_TOKEN_URL")
                    .filter(|u| !u.trim().is_empty())
                {
                    identity.token_url = url.trim().to_string();
                }
                identity
            });

        let debug_mode = match lookup("DEBUG_MODE") {
            Some(raw) => parse_bool("DEBUG_MODE", &raw)?,
            None => false,
        };

        let knowledge_path = lookup("KNOWLEDGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/knowledge.md"));

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string());

        let allowed_origins: Vec<String> = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let session_eviction = match lookup("SESSION_MAX_ENTRIES") {
            Some(raw) => EvictionPolicy::MaxEntries(parse_positive_usize(
                "SESSION_MAX_ENTRIES",
                &raw,
            )?),
            None => EvictionPolicy::Unbounded,
        };

        Ok(Self {
            llm: LlmConfig {
                base_url,
                api_path,
                model,
                api_key,
                timeout,
                identity,
            },
            debug_mode,
            knowledge_path,
            bind_addr,
            allowed_origins,
            session_eviction,
            history_limit: DEFAULT_HISTORY_LIMIT,
            prompt_history: DEFAULT_PROMPT_HISTORY,
        })
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(invalid(key, format!("expected a boolean, got {other:?}"))),
    }
}

fn parse_positive_f64(key: &str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| invalid(key, format!("{e}")))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(key, "must be a positive number"));
    }
    Ok(value)
}

fn parse_timeout(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = parse_positive_f64(key, raw)?;
    Duration::try_from_secs_f64(secs).map_err(|e| invalid(key, format!("{e}")))
}

fn parse_positive_usize(key: &str, raw: &str) -> Result<usize, ConfigError> {
    let value: usize = raw
        .trim()
        .parse()
        .map_err(|e| invalid(key, format!("{e}")))?;
    if value == 0 {
        return Err(invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

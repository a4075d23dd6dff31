//! Error types for the onboarding chat service.

use std::path::PathBuf;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures loading the knowledge document. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("Knowledge base file missing: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Language-model service errors.
///
/// Every variant belongs to the same recoverable failure class: the
/// orchestrator logs it and substitutes a scripted reply.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} responded with status {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Caller-visible chat request errors.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_not_found_names_path() {
        let err = KnowledgeError::NotFound(PathBuf::from("data/missing.md"));
        assert_eq!(err.to_string(), "Knowledge base file missing: data/missing.md");
    }

    #[test]
    fn llm_status_display() {
        let err = LlmError::Status {
            provider: "openai-compatible".to_string(),
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Provider openai-compatible responded with status 503: overloaded"
        );
    }

    #[test]
    fn chat_error_message() {
        assert_eq!(
            ChatError::EmptyMessage.to_string(),
            "message cannot be empty"
        );
        let err = ConfigError::MissingEnvVar("LLM_MODEL_NAME".to_string());
        assert!(err.to_string().contains("LLM_MODEL_NAME"));
    }
}

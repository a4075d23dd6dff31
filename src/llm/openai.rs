//! OpenAI-compatible `chat/completions` client.
//!
//! Authenticates with a static API key, or with a Google Cloud identity
//! token fetched from the metadata server before every call.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;

use super::{IdentityConfig, LlmConfig};
use super::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider};
use crate::error::LlmError;

const PROVIDER: &str = "openai-compatible";

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

/// Talks to any service exposing the OpenAI chat completions shape.
///
/// One request per call, no retries. The configured timeout covers the
/// whole exchange.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    identity: Option<IdentityConfig>,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: join_endpoint(&config.base_url, &config.api_path),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            identity: config.identity.clone(),
        })
    }

    /// Fully resolved request URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Bearer credential for the next call: a fresh identity token when
    /// configured, else the API key.
    async fn bearer_token(&self) -> Result<Option<SecretString>, LlmError> {
        match self.identity {
            Some(ref identity) => self.fetch_identity_token(identity).await.map(Some),
            None => Ok(self.api_key.clone()),
        }
    }

    /// Ask the metadata server for an identity token scoped to the audience.
    async fn fetch_identity_token(
        &self,
        identity: &IdentityConfig,
    ) -> Result<SecretString, LlmError> {
        let failed = |reason: String| {
            tracing::error!(
                audience = %identity.audience,
                reason = %reason,
                "Identity token fetch failed"
            );
            LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason,
            }
        };

        let response = self
            .client
            .get(&identity.token_url)
            .query(&[("audience", identity.audience.as_str())])
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| failed(format!("identity token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("identity token endpoint returned {status}")));
        }

        let token = response
            .text()
            .await
            .map_err(|e| failed(format!("failed to read identity token: {e}")))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(failed("identity token endpoint returned an empty token".to_string()));
        }
        Ok(SecretString::from(token.to_string()))
    }
}

/// Join base URL and path, dropping a duplicated `/v1` segment.
pub(crate) fn join_endpoint(base_url: &str, api_path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = if api_path.starts_with('/') {
        api_path.to_string()
    } else {
        format!("/{api_path}")
    };
    let path = if base.ends_with("/v1") && path.starts_with("/v1/") {
        &path[3..]
    } else {
        path.as_str()
    };
    format!("{base}{path}")
}

/// Pull `choices[0].message.content` out of a response body.
fn extract_content(body: &Value) -> Result<String, LlmError> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("missing choices[0].message.content in {body}"),
        })
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: request.wire_messages(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = self.bearer_token().await? {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: if e.is_timeout() {
                format!("timed out: {e}")
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "LLM returned error status");
            return Err(LlmError::Status {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("failed to read body: {e}"),
        })?;
        let json: Value = serde_json::from_str(&text)?;
        let content = extract_content(&json)?;

        Ok(CompletionResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use std::collections::HashMap;

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured {
        body: Arc<Mutex<Option<Value>>>,
        auth: Arc<Mutex<Option<String>>>,
    }

    async fn ok_handler(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        *captured.body.lock().unwrap() = Some(body);
        *captured.auth.lock().unwrap() = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello from upstream"}}]
        }))
    }

    /// Metadata-server stand-in: echoes a token derived from the audience.
    async fn identity_handler(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        if headers.get("metadata-flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
            return (StatusCode::FORBIDDEN, "missing Metadata-Flavor".to_string());
        }
        match params.get("audience") {
            Some(audience) => (StatusCode::OK, format!("id-token-for-{audience}\n")),
            None => (StatusCode::BAD_REQUEST, "missing audience".to_string()),
        }
    }

    async fn error_handler() -> impl IntoResponse {
        (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
    }

    async fn bad_shape_handler() -> impl IntoResponse {
        Json(serde_json::json!({"choices": []}))
    }

    async fn slow_handler() -> impl IntoResponse {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(serde_json::json!({"choices": [{"message": {"content": "late"}}]}))
    }

    /// Serve a mock upstream on a random port; returns its base URL.
    async fn start_upstream(captured: Captured) -> String {
        let app = Router::new()
            .route("/v1/chat/completions", post(ok_handler))
            .route("/error/chat/completions", post(error_handler))
            .route("/bad/chat/completions", post(bad_shape_handler))
            .route("/slow/chat/completions", post(slow_handler))
            .route("/identity", get(identity_handler))
            .route("/identity-denied", get(error_handler))
            .with_state(captured);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{port}")
    }

    fn config(base_url: &str, api_path: &str, key: Option<&str>) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            api_path: api_path.to_string(),
            model: "test-model".to_string(),
            api_key: key.map(|k| SecretString::from(k.to_string())),
            timeout: Duration::from_millis(300),
            identity: None,
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("system text", vec![ChatMessage::user("hi")])
    }

    #[test]
    fn join_endpoint_variants() {
        assert_eq!(
            join_endpoint("http://x/", "/v1/chat/completions"),
            "http://x/v1/chat/completions"
        );
        assert_eq!(
            join_endpoint("http://x/v1", "/v1/chat/completions"),
            "http://x/v1/chat/completions"
        );
        assert_eq!(
            join_endpoint("http://x/v1/", "chat/completions"),
            "http://x/v1/chat/completions"
        );
        assert_eq!(join_endpoint("http://x/api", "v1/chat"), "http://x/api/v1/chat");
    }

    #[test]
    fn extract_content_requires_string() {
        let ok = serde_json::json!({"choices": [{"message": {"content": "yo"}}]});
        assert_eq!(extract_content(&ok).unwrap(), "yo");

        for bad in [
            serde_json::json!({}),
            serde_json::json!({"choices": []}),
            serde_json::json!({"choices": [{"message": {}}]}),
            serde_json::json!({"choices": [{"message": {"content": 7}}]}),
        ] {
            assert!(matches!(
                extract_content(&bad),
                Err(LlmError::InvalidResponse { .. })
            ));
        }
    }

    #[tokio::test]
    async fn sends_model_messages_and_bearer() {
        let captured = Captured::default();
        let base = start_upstream(captured.clone()).await;
        let provider =
            OpenAiCompatibleProvider::new(&config(&format!("{base}/v1"), "/v1/chat/completions", Some("sk-1")))
                .unwrap();

        let response = provider.complete(request()).await.unwrap();
        assert_eq!(response.content, "Hello from upstream");

        let body = captured.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "system text");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(
            captured.auth.lock().unwrap().clone(),
            Some("Bearer sk-1".to_string())
        );
    }

    #[tokio::test]
    async fn omits_authorization_without_key() {
        let captured = Captured::default();
        let base = start_upstream(captured.clone()).await;
        let provider =
            OpenAiCompatibleProvider::new(&config(&base, "/v1/chat/completions", None)).unwrap();

        provider.complete(request()).await.unwrap();
        assert!(captured.auth.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn error_status_is_failure() {
        let base = start_upstream(Captured::default()).await;
        let provider =
            OpenAiCompatibleProvider::new(&config(&base, "/error/chat/completions", None)).unwrap();

        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 503, ref body, .. } if body == "overloaded"));
    }

    #[tokio::test]
    async fn malformed_body_is_failure() {
        let base = start_upstream(Captured::default()).await;
        let provider =
            OpenAiCompatibleProvider::new(&config(&base, "/bad/chat/completions", None)).unwrap();

        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn timeout_is_failure() {
        let base = start_upstream(Captured::default()).await;
        let provider =
            OpenAiCompatibleProvider::new(&config(&base, "/slow/chat/completions", None)).unwrap();

        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let provider = OpenAiCompatibleProvider::new(&config(
            &format!("http://127.0.0.1:{port}"),
            "/v1/chat/completions",
            None,
        ))
        .unwrap();

        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }

    #[tokio::test]
    async fn identity_token_replaces_api_key() {
        let captured = Captured::default();
        let base = start_upstream(captured.clone()).await;
        let mut config = config(&base, "/v1/chat/completions", Some("sk-1"));
        config.identity = Some(IdentityConfig {
            audience: "https://llm.example".to_string(),
            token_url: format!("{base}/identity"),
        });
        let provider = OpenAiCompatibleProvider::new(&config).unwrap();

        let response = provider.complete(request()).await.unwrap();
        assert_eq!(response.content, "Hello from upstream");
        assert_eq!(
            captured.auth.lock().unwrap().clone(),
            Some("Bearer id-token-for-https://llm.example".to_string())
        );
    }

    #[tokio::test]
    async fn identity_token_failure_skips_completion() {
        let captured = Captured::default();
        let base = start_upstream(captured.clone()).await;
        let mut config = config(&base, "/v1/chat/completions", Some("sk-1"));
        config.identity = Some(IdentityConfig {
            audience: "https://llm.example".to_string(),
            token_url: format!("{base}/identity-denied"),
        });
        let provider = OpenAiCompatibleProvider::new(&config).unwrap();

        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { ref reason, .. } if reason.contains("503")));
        assert!(captured.body.lock().unwrap().is_none());
    }
}

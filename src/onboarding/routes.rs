//! HTTP endpoints for the onboarding chat.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::manager::{ChatRequest, OnboardingManager};
use crate::error::ChatError;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct ChatRouteState {
    pub manager: Arc<OnboardingManager>,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match self {
            ChatError::EmptyMessage => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

/// POST /chat
///
/// Runs one onboarding turn. Model failures still return 200 with a
/// scripted reply; only an empty message is rejected.
async fn chat(
    State(state): State<ChatRouteState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ChatError> {
    let response = state.manager.chat(request).await?;
    Ok(Json(response))
}

/// GET /api/v1/health
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "message": "Onboarding chat service is running",
    }))
}

/// GET /
async fn root() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the chat routes without middleware.
pub fn chat_routes(state: ChatRouteState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/v1/health", get(health))
        .route("/chat", post(chat))
        .with_state(state)
}

/// CORS restricted to the configured origins, with credentials allowed.
/// Unparseable origins are skipped.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // credentials forbid wildcards, so methods and headers are mirrored
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// The full application: routes plus CORS and request tracing.
pub fn app(manager: Arc<OnboardingManager>, allowed_origins: &[String]) -> Router {
    chat_routes(ChatRouteState { manager }).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(allowed_origins)),
    )
}

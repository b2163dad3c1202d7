use crate::coordinator::{ChatError, Coordinator};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use watchbot_api::{ChatRequest, ChatResponse, ErrorResponse, ProbeResponse, RequestError};
use watchbot_core::errors::GeminiError;

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }
}

/// Error type for HTTP server
#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(RequestError),
    NotConfigured,
    InvalidApiKey,
    QuotaExceeded,
    ContentFiltered,
    NoResponseText,
    Internal(String),
}

impl ApiError {
    /// Maps a generation failure onto the status the client sees.
    pub fn from_generation(err: &GeminiError) -> Self {
        let message = err.to_string();
        let lowered = message.to_lowercase();
        let status = err.upstream_status();

        if message.contains("API_KEY_INVALID")
            || lowered.contains("invalid api key")
            || status == Some(401)
        {
            Self::InvalidApiKey
        } else if message.contains("QUOTA_EXCEEDED")
            || message.contains("RESOURCE_EXHAUSTED")
            || lowered.contains("quota")
            || status == Some(429)
        {
            Self::QuotaExceeded
        } else if message.contains("SAFETY") {
            Self::ContentFiltered
        } else if message.contains("No response text") {
            Self::NoResponseText
        } else {
            Self::Internal(message)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::ContentFiltered => StatusCode::BAD_REQUEST,
            Self::InvalidApiKey => StatusCode::UNAUTHORIZED,
            Self::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::NotConfigured | Self::NoResponseText | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::InvalidRequest(e) => e.to_string(),
            Self::NotConfigured => "Gemini API key not configured".to_string(),
            Self::InvalidApiKey => "Invalid API key".to_string(),
            Self::QuotaExceeded => "API quota exceeded".to_string(),
            Self::ContentFiltered => "Content filtered for safety reasons".to_string(),
            Self::NoResponseText => "No response text received from Gemini API".to_string(),
            Self::Internal(_) => "Failed to generate response. Please try again.".to_string(),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NotConfigured => Self::NotConfigured,
            ChatError::Generation(e) => Self::from_generation(&e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::InvalidRequest(e) => warn!(error = %e, "Rejected chat request"),
            Self::Internal(detail) => error!(error = %detail, "Error in chat API"),
            other => error!(status = status.as_u16(), error = ?other, "Chat request failed"),
        }

        let body = Json(ErrorResponse {
            error: self.client_message(),
        });
        (status, body).into_response()
    }
}

/// Builds the router; split out from [`run_server`] so it can be driven in tests
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/chat", post(handle_chat))
        .route("/api/chat", post(handle_chat))
        .route("/api/test", get(handle_probe))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start HTTP server: {}", e))
}

/// Health check handler
async fn health() -> impl IntoResponse {
    "watchbot is running"
}

/// Handler for chat requests
async fn handle_chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = ChatRequest::parse(&body).map_err(ApiError::InvalidRequest)?;
    info!(
        message_len = request.message.len(),
        history_len = request.conversation_history.len(),
        "Chat request received"
    );

    let response = state.coordinator.process_chat(request).await?;
    Ok(Json(response))
}

/// Connectivity probe for the generation provider
async fn handle_probe(State(state): State<AppState>) -> Result<Json<ProbeResponse>, ApiError> {
    let response = state.coordinator.probe().await?;
    Ok(Json(ProbeResponse {
        success: true,
        response,
    }))
}

//! HTTP API gateway for Bia.
//!
//! Two routes: `GET /health` (unauthenticated liveness probe) and
//! `POST /chat` (bearer-token guarded chat endpoint). Built on Axum.

pub mod auth;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use bia_agent::ChatEngine;
use bia_core::error::Error;
use bia_core::provider::Provider;
use bia_core::storage::Storage;

/// Shared application state for the gateway.
pub struct AppState {
    pub engine: ChatEngine,
    pub api_token: Option<String>,
    /// True when the persistent backend was selected at startup.
    pub db_backed: bool,
    pub default_max_history: i64,
}

pub type SharedState = Arc<AppState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// The storage backend and provider are chosen once by the caller and
/// injected; the engine is shared across all requests.
pub async fn start(
    config: bia_config::AppConfig,
    storage: Arc<dyn Storage>,
    provider: Arc<dyn Provider>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = config.gateway.host.clone();
    let port = port_override.unwrap_or(config.gateway.port);
    let addr = format!("{host}:{port}");

    let db_backed = storage.name() == "postgres";
    let engine = ChatEngine::new(storage, provider, &config.model, &config.base_prompt);

    let state = Arc::new(AppState {
        engine,
        api_token: config.api_token.clone(),
        db_backed,
        default_max_history: config.default_max_history,
    });

    let app = build_router(state);

    info!(addr = %addr, db_backed, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db: bool,
    model: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        db: state.db_backed,
        model: state.engine.model().to_string(),
    })
}

#[derive(Deserialize)]
struct ChatRequest {
    session_id: String,
    message: String,
    /// History window in raw turns; server default when omitted.
    #[serde(default)]
    max_history: Option<i64>,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    reply: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    auth::require_bearer(state.api_token.as_deref(), auth_header).map_err(error_response)?;

    let request_id = uuid::Uuid::new_v4();
    let session_id = payload.session_id.trim().to_string();
    let max_history = payload.max_history.unwrap_or(state.default_max_history);

    info!(%request_id, session_id = %session_id, "chat request");

    let reply = state
        .engine
        .handle_message(&session_id, &payload.message, max_history)
        .await
        .map_err(error_response)?;

    Ok(Json(ChatResponse { session_id, reply }))
}

/// Map a domain error to its HTTP shape: auth failures are 401, every
/// server-side fault (config, storage, upstream) is 500 with a
/// truncated diagnostic in the body.
fn error_response(e: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        Error::Auth(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::UNAUTHORIZED {
        warn!(error = %e, "request rejected");
    } else {
        error!(error = %e, "request failed");
    }

    (status, Json(ErrorResponse { error: e.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    use bia_core::error::ProviderError;
    use bia_core::types::ChatTurn;
    use bia_storage::InMemoryStore;

    struct StubProvider {
        replies: Mutex<Vec<String>>,
        calls: Mutex<usize>,
    }

    impl StubProvider {
        fn replying(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
                calls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            _model: &str,
            _instructions: &str,
            _history: &[ChatTurn],
        ) -> Result<String, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.replies.lock().unwrap().remove(0))
        }
    }

    fn test_state(api_token: Option<&str>, provider: Arc<StubProvider>) -> SharedState {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStore::new());
        let engine = ChatEngine::new(storage, provider, "gpt-4o", "You are Bia. Stay in voice.");
        Arc::new(AppState {
            engine,
            api_token: api_token.map(str::to_string),
            db_backed: false,
            default_max_history: 20,
        })
    }

    fn chat_request(auth: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("Content-Type", "application/json");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_needs_no_auth() {
        let app = build_router(test_state(Some("s3cret"), StubProvider::replying(&[])));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["db"], false);
        assert_eq!(json["model"], "gpt-4o");
    }

    #[tokio::test]
    async fn chat_without_token_is_401() {
        let app = build_router(test_state(Some("s3cret"), StubProvider::replying(&[])));
        let body = r#"{"session_id": "s1", "message": "hello"}"#;

        let response = app.oneshot(chat_request(None, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_with_malformed_header_is_401() {
        let app = build_router(test_state(Some("s3cret"), StubProvider::replying(&[])));
        let body = r#"{"session_id": "s1", "message": "hello"}"#;

        let response = app
            .oneshot(chat_request(Some("Basic s3cret"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_with_wrong_token_is_401() {
        let app = build_router(test_state(Some("s3cret"), StubProvider::replying(&[])));
        let body = r#"{"session_id": "s1", "message": "hello"}"#;

        let response = app
            .oneshot(chat_request(Some("Bearer nope42"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_without_configured_secret_is_500() {
        let app = build_router(test_state(None, StubProvider::replying(&[])));
        let body = r#"{"session_id": "s1", "message": "hello"}"#;

        let response = app
            .oneshot(chat_request(Some("Bearer anything"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn chat_round_trip() {
        let app = build_router(test_state(
            Some("s3cret"),
            StubProvider::replying(&["hi there"]),
        ));
        let body = r#"{"session_id": "s1", "message": "hello"}"#;

        let response = app
            .oneshot(chat_request(Some("Bearer s3cret"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["session_id"], "s1");
        assert_eq!(json["reply"], "hi there");
    }

    #[tokio::test]
    async fn remember_over_http_skips_the_provider() {
        let provider = StubProvider::replying(&[]);
        let app = build_router(test_state(Some("s3cret"), Arc::clone(&provider)));
        let body = r#"{"session_id": "s1", "message": "/remember likes tea"}"#;

        let response = app
            .oneshot(chat_request(Some("Bearer s3cret"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["reply"], bia_agent::engine::REMEMBER_ACK);
        assert_eq!(*provider.calls.lock().unwrap(), 0);
    }
}

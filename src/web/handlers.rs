//! # HTTP Handlers
//!
//! | Handler | Method | Status codes |
//! |---------|--------|--------------|
//! | `ping` | GET | 200 |
//! | `chat` | POST | 200 reply or prompt, 400 bad JSON, 429 busy, 503 storage down |
//! | `analytics` | GET | 200 |
//!
//! ## Chat Body
//!
//! ```json
//! { "message": "do you ship internationally", "session_id": "…optional uuid…" }
//! ```
//!
//! The body is parsed by hand rather than through `Json<T>` so every
//! malformed payload maps to the same 400 response.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::state::AppState;
use crate::analytics::Analytics;
use crate::orchestrator::{TurnOutcome, BUSY_REPLY, EMPTY_PROMPT, UNAVAILABLE_REPLY};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// GET `/assistant/ping/`
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "app": "assistant" }))
}

/// POST `/assistant/chat/` — runs one turn.
///
/// The orchestrator does blocking I/O (FAQ page fetch, SMTP), so the turn
/// and the snapshot that follows it run on the blocking pool.
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "rejected chat payload");
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid JSON payload." }))).into_response();
        }
    };
    let message = request.message.unwrap_or_default();

    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = state.orchestrator.handle(request.session_id.as_deref(), &message);
        if matches!(outcome, TurnOutcome::Answered(_)) {
            state.snapshots.save(&state.store);
        }
        outcome
    })
    .await;

    match outcome {
        Ok(TurnOutcome::Answered(reply)) => (StatusCode::OK, Json(reply)).into_response(),
        Ok(TurnOutcome::Empty) => (StatusCode::OK, Json(json!({ "reply": EMPTY_PROMPT }))).into_response(),
        Ok(TurnOutcome::Busy { session_id }) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "session_id": session_id, "reply": BUSY_REPLY })),
        )
            .into_response(),
        Ok(TurnOutcome::Unavailable) => unavailable(),
        Err(e) => {
            tracing::error!(error = %e, "chat turn panicked");
            unavailable()
        }
    }
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "reply": UNAVAILABLE_REPLY, "requires_human": false })),
    )
        .into_response()
}

/// GET `/assistant/analytics/`
pub async fn analytics(State(state): State<AppState>) -> Json<Analytics> {
    let now = chrono::Utc::now();
    Json(state.store.read(|data| crate::analytics::analytics(data, now)))
}

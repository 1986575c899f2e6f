//! # Web Layer
//!
//! JSON endpoints consumed by the storefront's chat widget, built with
//! **Axum**.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Chat widget (storefront)                                │
//! ├─────────────────────────────────────────────────────────┤
//! │ Axum Router (this module)                               │
//! │  ├── GET  /assistant/ping/       → liveness JSON        │
//! │  ├── POST /assistant/chat/       → one chat turn        │
//! │  └── GET  /assistant/analytics/  → chat + lead stats    │
//! ├─────────────────────────────────────────────────────────┤
//! │ TraceLayer (request spans) + permissive CORS            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`state`] | Shared state (`AppState`, `Snapshotter`) |
//! | [`handlers`] | Axum handlers for each route |

pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Builds the router with every route of the assistant.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/assistant/ping/", get(handlers::ping))
        .route("/assistant/chat/", post(handlers::chat))
        .route("/assistant/analytics/", get(handlers::analytics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

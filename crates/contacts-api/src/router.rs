use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::contacts;
use crate::state::AppState;
use crate::verification;

/// Application routes. CORS, tracing and connect-info are the caller's
/// concern.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/register", post(verification::register))
        .route("/verify", post(verification::verify))
        .route("/create_contact", post(contacts::create_contact))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

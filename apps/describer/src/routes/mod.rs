pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/models", get(handlers::handle_list_models))
        .route(
            "/api/v1/prompt/defaults",
            get(handlers::handle_prompt_defaults),
        )
        // Descriptions API
        .route(
            "/api/v1/descriptions/preview",
            post(handlers::handle_preview),
        )
        .route(
            "/api/v1/descriptions/generate",
            post(handlers::handle_generate),
        )
        .route(
            "/api/v1/descriptions/generate/csv",
            post(handlers::handle_generate_csv),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

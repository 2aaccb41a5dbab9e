pub mod domains;
pub mod middleware;
pub mod postgrest;
pub mod protocol;
pub mod questions;
pub mod rest;
pub mod sequencer_task;
pub mod sessions;
pub mod state;
pub mod uploads;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::web::state::AppState;

pub use middleware::cors;
pub use rest::ApiDoc;

/// Largest upload body accepted by `PUT /uploads/*`.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Builds the complete API router around the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/presign", post(rest::presign_handler))
        .route("/uploads/{*key}", put(uploads::upload_handler))
        .route(
            "/rest/v1/resource_repositories",
            post(rest::create_repository_handler),
        )
        .route(
            "/rest/v1/resource_sessions",
            get(sessions::list_sessions_handler)
                .post(sessions::create_sessions_handler)
                .patch(sessions::update_session_handler),
        )
        .route(
            "/rest/v1/resource_session_domains",
            get(domains::list_domains_handler).post(domains::create_domains_handler),
        )
        .route(
            "/rest/v1/resource_session_questions",
            get(questions::list_questions_handler)
                .post(questions::create_questions_handler)
                .patch(questions::update_question_handler),
        )
        .route("/health", get(rest::health_handler))
        .route("/admin/reset", post(rest::reset_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(cors))
        .with_state(app_state)
}

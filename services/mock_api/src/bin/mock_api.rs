//! services/mock_api/src/bin/mock_api.rs

use mock_api_lib::{
    config::Config,
    error::ApiError,
    web::{router, state::AppState, ApiDoc},
};
use axum::Router;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(
        sequence = ?config.state_sequence,
        questions_per_topic = config.questions_per_topic,
        "Configuration loaded. Starting server..."
    );

    // --- 2. Build the Shared AppState ---
    let bind_address = config.bind_address;
    let public_url = config.public_url.clone();
    let app_state = Arc::new(AppState::in_memory(config));

    // --- 3. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 4. Start the Server ---
    info!("Starting server on {}", bind_address);
    info!("Uploads presigned against {}", public_url);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbHistoryStore, OpenAiLessonAdapter, OpenAiTtsAdapter},
    config::Config,
    error::ApiError,
    web::{
        audio_handler, change_level_handler, generate_lesson_handler, list_history_handler,
        load_lesson_handler, reset_session_handler, rest::ApiDoc, session_snapshot_handler,
        state::AppState, transcript_handler, worksheet_handler,
    },
};
use async_openai::{
    config::OpenAIConfig,
    types::audio::{SpeechModel, Voice},
    Client,
};
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let history_store = Arc::new(DbHistoryStore::new(db_pool.clone()));
    info!("Running database migrations...");
    history_store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    // A missing key does not stop the server: history browsing and worksheet
    // exports keep working, and only generation/synthesis requests fail.
    let api_key_present = config.openai_api_key.is_some();
    if !api_key_present {
        warn!("OPENAI_API_KEY is not set; lesson generation and audio export will be unavailable");
    }
    let openai_config = match &config.openai_api_key {
        Some(key) => OpenAIConfig::new().with_api_key(key),
        None => OpenAIConfig::new(),
    };
    let openai_client = Client::with_config(openai_config);

    let lesson_adapter = Arc::new(OpenAiLessonAdapter::new(
        openai_client.clone(),
        config.lesson_model.clone(),
        api_key_present,
    ));

    let tts_voice = match config.tts_voice.to_lowercase().as_str() {
        "alloy" => Voice::Alloy,
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "nova" => Voice::Nova,
        "shimmer" => Voice::Shimmer,
        _ => {
            return Err(ApiError::Internal(format!(
                "Invalid TTS voice specified in config: '{}'",
                config.tts_voice
            )))
        }
    };
    let tts_adapter = Arc::new(OpenAiTtsAdapter::new(
        openai_client.clone(),
        SpeechModel::Tts1Hd,
        tts_voice,
        api_key_present,
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        history_store,
        lesson_adapter,
        tts_adapter,
    ));

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/session", get(session_snapshot_handler))
        .route("/session/generate", post(generate_lesson_handler))
        .route("/session/level", post(change_level_handler))
        .route("/session/load/{id}", post(load_lesson_handler))
        .route("/session/reset", post(reset_session_handler))
        .route("/history", get(list_history_handler))
        .route("/lessons/{id}/worksheet", get(worksheet_handler))
        .route("/lessons/{id}/transcript", get(transcript_handler))
        .route("/lessons/{id}/audio", get(audio_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

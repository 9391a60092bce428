//! AgriAssist - voice-first farming assistant service
//!
//! A Rust backend driving a multilingual tool-calling conversation with
//! Gemini, plus the marketplace, profile and advisor endpoints the mobile
//! client uses.

mod actions;
mod advisor;
mod api;
mod db;
mod history;
mod language;
mod llm;
mod market;
mod runtime;
mod speech;
mod state_machine;
mod store;
mod system_prompt;

use api::{create_router, AppState};
use db::Database;
use language::{LanguageSelection, DEFAULT_LANGUAGE};
use llm::LlmConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agriassist=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("AGRI_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.agriassist/agriassist.db")
    });

    let port: u16 = std::env::var("AGRI_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let language_code =
        std::env::var("AGRI_LANGUAGE").unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string());
    let language = LanguageSelection::new(&language_code).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Falling back to {DEFAULT_LANGUAGE}");
        LanguageSelection::default()
    });

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    // The service still starts without credentials; every turn then gets the error reply
    let llm_config = LlmConfig::from_env();
    let service = llm_config.build_service();
    if service.is_some() {
        tracing::info!(model = %llm_config.model(), "Gemini service initialized");
    } else {
        tracing::warn!("No Gemini credentials configured. Set GEMINI_API_KEY or LLM_GATEWAY.");
    }

    let state = AppState::new(db, service, language);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("AgriAssist server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Main Entrypoint for the Tutor API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading prompt templates (built-in, optionally overridden from disk).
//! 3. Initializing the generation client and curriculum service.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tutor_api::{config::Config, router::create_router, state::AppState};
use tutor_core::{
    curriculum::{CurriculumSynthesizer, LLMCurriculumSynthesizer},
    llm_client::{LLMClient, OpenAICompatibleClient},
    prompts::PromptSet,
};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.engine.log_level.to_string().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let prompts = match &config.engine.prompts_path {
        Some(path) => PromptSet::from_dir(path)
            .with_context(|| format!("Failed to load prompts from {}", path.display()))?,
        None => PromptSet::default(),
    };
    let prompts = Arc::new(prompts);

    info!(provider = ?config.engine.provider, "Using {} API base.", config.engine.provider.api_base());
    let llm_client: Arc<dyn LLMClient> =
        Arc::new(OpenAICompatibleClient::from_engine_config(&config.engine));
    let curriculum_service: Arc<dyn CurriculumSynthesizer> = Arc::new(
        LLMCurriculumSynthesizer::new(llm_client.clone(), prompts.clone()),
    );

    let app_state = Arc::new(AppState::new(
        llm_client,
        curriculum_service,
        prompts,
        config.engine.language.clone(),
    ));

    let sweep_every = config.session_ttl.min(Duration::from_secs(60)).max(Duration::from_secs(1));
    let _expiry = app_state.sessions.spawn_expiry(config.session_ttl, sweep_every);
    info!(ttl_secs = config.session_ttl.as_secs(), "Idle session expiry scheduled");

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.engine.provider,
        model = %config.engine.chat_model,
        language = %config.engine.language,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use literature_quiz::{
    api::{create_router, AppState},
    auth::{GoogleTokenInfo, UserStore},
    config::Config,
    llm_providers::GeminiProvider,
    log_system_event,
    logging::init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _guard = init_tracing(&config.logging, "literature-quiz.log")?;
    config.log_configuration_summary();
    config.validate()?;

    log_system_event!(startup, component = "server", "Starting literature quiz relay");

    let gemini = match &config.gemini.api_key {
        Some(key) => {
            info!(length = key.len(), "GEMINI_API_KEY loaded successfully");
            Some(Arc::new(GeminiProvider::new(
                key.clone(),
                config.gemini.base_url.clone(),
                config.gemini.model.clone(),
            )))
        }
        None => {
            warn!("GEMINI_API_KEY is not set. Set it in .env to enable Gemini requests.");
            None
        }
    };

    let redirect_uri = config
        .auth
        .public_base_url
        .clone()
        .unwrap_or_else(|| format!("http://localhost:{}", config.server.port));

    let state = AppState {
        gemini,
        users: UserStore::new(&config.auth.users_file),
        verifier: Arc::new(GoogleTokenInfo::new(config.auth.google_client_id.clone())),
        google_client_id: config.auth.google_client_id.clone(),
        redirect_uri,
    };

    let app = create_router(state);

    let addr = config.server.address();
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    log_system_event!(shutdown, component = "server", "Relay stopped");
    Ok(())
}

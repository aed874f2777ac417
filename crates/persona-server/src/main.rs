use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use persona_core::secret::SecretService;
use persona_infrastructure::{ConfigService, InMemoryPersonaRepository, SecretServiceImpl};
use persona_interaction::{GeminiApiAgent, StepOrchestrator};
use persona_server::{AppState, build_router};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "persona-server")]
#[command(about = "Persona chat server - five-step chain-of-thought answers over HTTP", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to $PERSONA_CHAT_CONFIG or the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `[server] bind_addr`
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,persona_server=debug,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_service = match &cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::from_env()?,
    };
    let config = config_service.load().await?;
    tracing::info!(
        path = %config_service.path().display(),
        personas = config.personas.len(),
        "Configuration ready"
    );

    let secrets = SecretServiceImpl::beside_config(config_service.path());
    let api_key = secrets
        .gemini_api_key()
        .await
        .context("Set GOOGLE_API_KEY or add a gemini section to secret.json")?;
    let model = secrets
        .load_secrets()
        .await?
        .gemini
        .and_then(|gemini| gemini.model_name)
        .unwrap_or_else(|| config.gemini.model.clone());

    let client = GeminiApiAgent::new(api_key)
        .with_model(model)
        .with_base_url(config.gemini.base_url.clone());
    tracing::info!(model = client.model(), "Gemini client ready");

    let state = AppState {
        personas: Arc::new(InMemoryPersonaRepository::new(config.personas.clone())),
        orchestrator: Arc::new(StepOrchestrator::new(
            Arc::new(client),
            config.orchestrator.clone(),
        )),
    };

    let bind_addr = cli.bind.unwrap_or(config.server.bind_addr);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}

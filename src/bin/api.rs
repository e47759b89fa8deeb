use financial_research_assistant::{api::start_server, audit::AuditLog, build_orchestrator, Config, SessionManager};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Financial Research Assistant - API Server");
    info!(port = config.api_port, strategy = %config.strategy, "Configuration loaded");

    let orchestrator = Arc::new(build_orchestrator(&config).await?);
    let sessions = Arc::new(SessionManager::new(
        orchestrator,
        Arc::new(AuditLog::new()),
        config.history_exchanges,
    ));

    info!("Orchestrator initialized, starting API server");

    start_server(sessions, config.api_port).await?;

    Ok(())
}

use enrich_server::core::{AppState, Config, database};
use enrich_server::create_router;
use enrich_server::enrich::HttpFetcher;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Inizializza il logging (RUST_LOG, default info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Inizializza la configurazione
    let config = Config::from_env()?;
    config.print_info();

    let pool = database::connect(&config.database_url, config.max_connections).await?;
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch_user_agent)?);

    let state = Arc::new(AppState::from_config(&config, pool, fetcher));
    let app = create_router(state.clone());

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // smaltisce i messaggi ancora in coda prima di uscire
    match Arc::try_unwrap(state) {
        Ok(state) => state.pipeline.shutdown().await,
        Err(_) => warn!("Application state still shared, pending messages not drained"),
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

use anyhow::Result;
use passkey_ceremony::create_router;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env if present; real deployments set the environment directly
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber to log to stdout
    tracing_subscriber::fmt::init();
    tracing::info!("Starting passkey ceremony server...");

    let app = create_router()?;

    // Get optional bind endpoint from environment
    let endpoint = env::var("API_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    info!("Starting at endpoint:{}", endpoint);
    info!("Starting Passkey Ceremony API server v{}...", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&endpoint).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    // ---
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

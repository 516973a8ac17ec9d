use mailsink_api::{ApiContext, build_router};
use mailsink_core::services::config::load_from_env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    info!("Starting Mailsink API server v{}", mailsink_core::VERSION);

    let config = load_from_env()?;
    let bind_addr = config.api_bind_addr.clone();

    let ctx = ApiContext::new(config)?;
    let app = build_router(Arc::clone(&ctx));

    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Listening for HTTP requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&ctx)))
        .await?;

    info!("Mailsink API server stopped");
    Ok(())
}

/// Resolves on ctrl-c, after ending the long-lived subscriber streams
async fn shutdown_signal(ctx: Arc<ApiContext>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    info!("Shutdown signal received");
    ctx.close_subscribers().await;
}

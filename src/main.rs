use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use docent_backend::state::AppState;
use docent_backend::{logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize()?;
    logging::init(&state.paths);

    // The index may still be provisioning at startup; search self-heals
    // later, so a failure here is only worth a warning.
    if let Err(err) = state.index.ensure_schema().await {
        tracing::warn!("Failed to ensure index schema: {}", err);
    }

    let bind_addr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

//! Loyalty rewards backend: single-use redemption codes, moderated stories and
//! a stepped per-organization discount driven by story moderation.

pub mod backend;
pub mod config;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

use crate::backend::{create_router, initialize_backend};
use crate::config::AppConfig;

/// Build the application and serve it until the process is stopped
pub async fn run(config: AppConfig) -> Result<()> {
    let state = initialize_backend(&config).await?;
    let router = create_router(state, &config.allowed_origin)?;

    info!("Starting server on {}", config.bind_addr);
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, router).await?;
    Ok(())
}

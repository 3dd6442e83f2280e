// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! EduTech auth API server.

use edutech_auth::{config::Config, db::UserDb, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting EduTech auth API");

    let db = match &config.gcp_project_id {
        Some(project_id) => UserDb::firestore(project_id).await?,
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, using in-memory user store");
            UserDb::in_memory()
        }
    };

    tracing::info!(
        access_minutes = config.access_token_expire_minutes,
        refresh_days = config.refresh_token_expire_days,
        "Token lifetimes configured"
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db));

    // Build router
    let app = edutech_auth::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("edutech_auth=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}

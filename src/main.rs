// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Acetrack API Server

use acetrack::{
    baas::{BaasClient, MemoryStore},
    config::{BaasMode, Config},
    services::CdnUploader,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        baas_mode = ?config.baas_mode,
        maintenance = config.maintenance_mode,
        "Starting Acetrack API"
    );

    let baas = match config.baas_mode {
        BaasMode::Remote => BaasClient::new(&config)?,
        BaasMode::Memory => {
            let secret = config.supabase_jwt_secret.clone().unwrap_or_default();
            tracing::warn!("Using the in-memory BaaS; data is lost on restart");
            BaasClient::in_memory(&config, Arc::new(MemoryStore::new(secret)))
        }
    };

    if config.cdn.cloud_name.is_empty() {
        tracing::warn!("CLOUDINARY_CLOUD_NAME not set, avatar uploads are disabled");
    }
    let cdn = CdnUploader::new(reqwest::Client::new(), config.cdn.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        baas,
        cdn,
    });

    let app = acetrack::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("acetrack=debug,info")),
        )
        .with(format)
        .init();
}

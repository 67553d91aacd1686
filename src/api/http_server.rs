// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::{net::SocketAddr, path::Path, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::webhook::callback_handler;
use crate::delivery::DeliveryGateway;
use crate::pipeline::DetectionService;
use crate::version;
use crate::vision::{VisionModelInfo, VisionModelManager};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DetectionService>,
    /// Used for immediate chat replies; detection uses the service's copy
    pub gateway: Arc<dyn DeliveryGateway>,
    pub models: Arc<VisionModelManager>,
    pub channel_secret: Arc<str>,
    /// Overrides the base URL derived from request headers
    pub public_base_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: serde_json::Value,
    pub models: Vec<VisionModelInfo>,
}

pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        // Liveness text
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        // Webhook endpoint
        .route("/callback", post(callback_handler))
        // Annotated results
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, static_dir: &Path, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state, static_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down HTTP server");
        })
        .await?;

    Ok(())
}

async fn root_handler() -> &'static str {
    "Object Detection API"
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.service.is_ready() {
        "healthy"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: version::get_version_info(),
        models: state.models.list_models(),
    })
}

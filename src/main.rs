// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use flockscan::{
    api::{start_server, AppState},
    config::BotConfig,
    delivery::{DeliveryGateway, LineMessagingClient},
    pipeline::{storage::SWEEP_INTERVAL, DetectionPipeline, DetectionService, ResultStore},
    vision::{ImageAnnotator, VisionModelManager},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Flockscan detection bot...\n");
    println!("📦 BUILD VERSION: {}", flockscan::version::VERSION);
    println!("📅 Build Date: {}", flockscan::version::BUILD_DATE);
    println!();
    tracing::info!("{}", flockscan::version::get_version_string());

    let config = BotConfig::from_env().map_err(|e| anyhow!(e))?;

    let store = ResultStore::new(&config.static_dir)?;
    println!("📁 Serving results from {}", store.tmp_dir().display());
    if let Some(max_age) = config.result_retention() {
        store.spawn_sweeper(SWEEP_INTERVAL, max_age);
        println!("🧹 Result images expire after {}s", max_age.as_secs());
    }

    // Models are loaded once; a failed load degrades the service
    println!("🧠 Loading vision models...");
    let models = Arc::new(VisionModelManager::new(config.vision_model_config()).await?);

    let annotator = match ImageAnnotator::new(config.annotator_config()) {
        Ok(annotator) => annotator,
        Err(e) => {
            tracing::warn!("⚠️ Annotation font unavailable, drawing boxes only: {:#}", e);
            ImageAnnotator::without_font(config.annotation_line_width)
        }
    };

    let pipeline = match DetectionPipeline::from_manager(&models, Arc::new(annotator)) {
        Ok(pipeline) => {
            println!("✅ Detection pipeline ready");
            Some(Arc::new(pipeline))
        }
        Err(e) => {
            tracing::error!(
                "⚠️ Detection pipeline unavailable, requests will be rejected: {}",
                e
            );
            None
        }
    };

    let gateway: Arc<dyn DeliveryGateway> =
        Arc::new(LineMessagingClient::new(config.line_client_config())?);

    let service = Arc::new(DetectionService::new(pipeline, gateway.clone(), store));

    let state = AppState {
        service,
        gateway,
        models,
        channel_secret: Arc::from(config.channel_secret.as_str()),
        public_base_url: config.public_base_url.clone(),
    };

    println!("🌐 Listening on {}", config.listen_addr);
    println!("\nPress Ctrl+C to shutdown...");

    start_server(state, &config.static_dir, config.listen_addr).await?;

    println!("👋 Shutdown complete");
    Ok(())
}

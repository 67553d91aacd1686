// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-request driver: acknowledge, run the pipeline off the request path,
//! push the result

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::errors::PipelineError;
use super::formatter::ResultFormatter;
use super::storage::{public_url, ResultStore};
use super::DetectionPipeline;
use crate::delivery::{DeliveryError, DeliveryGateway, OutboundMessage};
use crate::vision::decode_image_bytes;

/// One inbound image to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    /// Push destination
    pub recipient_id: String,
    /// Platform id of the image message, used to download its content
    pub message_id: String,
    /// Public base URL result images are served under
    pub base_url: String,
}

pub struct DetectionService {
    /// `None` when a model failed to load at startup
    pipeline: Option<Arc<DetectionPipeline>>,
    gateway: Arc<dyn DeliveryGateway>,
    store: ResultStore,
    formatter: ResultFormatter,
}

impl DetectionService {
    pub fn new(
        pipeline: Option<Arc<DetectionPipeline>>,
        gateway: Arc<dyn DeliveryGateway>,
        store: ResultStore,
    ) -> Self {
        Self {
            pipeline,
            gateway,
            store,
            formatter: ResultFormatter::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Send the "processing" notice for an event
    pub async fn acknowledge(&self, reply_token: &str) -> Result<(), DeliveryError> {
        self.gateway
            .reply(reply_token, vec![self.formatter.acknowledgment()])
            .await
    }

    /// Run one job to completion and build the push payload
    ///
    /// The raw upload is removed before this returns, on success or failure.
    pub async fn process(&self, job: &ImageJob) -> Result<Vec<OutboundMessage>, PipelineError> {
        let pipeline = self.pipeline.clone().ok_or_else(|| {
            PipelineError::ModelUnavailable("detection models not loaded".to_string())
        })?;

        let bytes = self.gateway.fetch_content(&job.message_id).await?;
        let upload = self.store.persist_upload(&bytes)?;

        let (decoded, info) = decode_image_bytes(&bytes)?;
        info!(
            "Processing image {} ({}x{}, {} bytes)",
            upload.stem(),
            info.width,
            info.height,
            info.size_bytes
        );
        let rgb = decoded.to_rgb8();

        let result = tokio::task::spawn_blocking(move || pipeline.run(&rgb))
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))??;

        let image_url = match result.annotated_image {
            Some(ref annotated) => {
                let stored = self.store.save_result(&upload, annotated)?;
                Some(public_url(&job.base_url, &stored.relative_url))
            }
            None => None,
        };

        info!(
            "Image {}: {} detections, {} classified",
            upload.stem(),
            result.detections.len(),
            result.classified_count()
        );

        Ok(self.formatter.result_messages(&result, image_url.as_deref()))
    }

    /// Process a job and push either its result or a failure notice
    pub async fn handle_image(&self, job: ImageJob) {
        let messages = match self.process(&job).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Image job {} failed: {}", job.message_id, e);
                vec![OutboundMessage::text(self.formatter.failure_message(&e))]
            }
        };

        if let Err(e) = self.gateway.push(&job.recipient_id, messages).await {
            error!("Failed to push result to {}: {}", job.recipient_id, e);
        }
    }

    /// Fire-and-forget processing of `job` on the runtime
    pub fn spawn(self: &Arc<Self>, job: ImageJob) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.handle_image(job).await })
    }
}

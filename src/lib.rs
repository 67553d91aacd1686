// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod delivery;
pub mod pipeline;
pub mod version;
pub mod vision;

pub use config::BotConfig;
pub use delivery::{
    DeliveryError, DeliveryGateway, LineMessagingClient, OutboundMessage, UserProfile,
};
pub use pipeline::{
    DetectionPipeline, DetectionService, ImageJob, PipelineError, PipelineResult, ResultFormatter,
    ResultStore,
};
pub use vision::{
    ClassificationResult, DetectionBox, DiseaseLabel, ImageAnnotator, InferenceError,
    RegionClassifier, RegionDetector, VisionModelManager,
};

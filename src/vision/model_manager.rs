// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for loading the detector and classifier

use serde::Serialize;
use std::sync::Arc;

use crate::vision::classifier::{OnnxRegionClassifier, RegionClassifier};
use crate::vision::detector::{DetectorParams, OnnxRegionDetector, RegionDetector};
use crate::vision::errors::InferenceError;

/// Configuration for loading vision models
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// Path to the detector ONNX file (optional)
    pub detector_model_path: Option<String>,
    /// Path to the classifier ONNX file (optional)
    pub classifier_model_path: Option<String>,
    /// Detector post-processing parameters
    pub detector_params: DetectorParams,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            detector_model_path: Some("./models/detector.onnx".to_string()),
            classifier_model_path: Some("./models/classifier.onnx".to_string()),
            detector_params: DetectorParams::default(),
        }
    }
}

/// Information about a loaded vision model
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionModelInfo {
    /// Model name
    pub name: String,
    /// Model role (detector, classifier)
    pub model_type: String,
    /// Whether the model is available
    pub available: bool,
}

/// Process-wide holder for the detector and classifier
///
/// Models are loaded once at startup. A model that fails to load is logged
/// and left empty so the service keeps running in a degraded state.
pub struct VisionModelManager {
    detector: Option<Arc<dyn RegionDetector>>,
    classifier: Option<Arc<dyn RegionClassifier>>,
}

impl VisionModelManager {
    /// Load both models from the configured paths
    ///
    /// Missing or broken model files are handled gracefully.
    pub async fn new(config: VisionModelConfig) -> anyhow::Result<Self> {
        let detector: Option<Arc<dyn RegionDetector>> =
            if let Some(ref path) = config.detector_model_path {
                match OnnxRegionDetector::new(path, config.detector_params).await {
                    Ok(model) => {
                        tracing::info!("✅ Detector model loaded from {}", path);
                        Some(Arc::new(model))
                    }
                    Err(e) => {
                        tracing::error!("⚠️ Failed to load detector model from {}: {:#}", path, e);
                        None
                    }
                }
            } else {
                None
            };

        let classifier: Option<Arc<dyn RegionClassifier>> =
            if let Some(ref path) = config.classifier_model_path {
                match OnnxRegionClassifier::new(path).await {
                    Ok(model) => {
                        tracing::info!("✅ Classifier model loaded from {}", path);
                        Some(Arc::new(model))
                    }
                    Err(e) => {
                        tracing::error!("⚠️ Failed to load classifier model from {}: {:#}", path, e);
                        None
                    }
                }
            } else {
                None
            };

        Ok(Self {
            detector,
            classifier,
        })
    }

    /// Build a manager from already constructed models
    pub fn from_models(
        detector: Option<Arc<dyn RegionDetector>>,
        classifier: Option<Arc<dyn RegionClassifier>>,
    ) -> Self {
        Self {
            detector,
            classifier,
        }
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Both models are loaded and detection requests can be served
    pub fn is_ready(&self) -> bool {
        self.has_detector() && self.has_classifier()
    }

    /// Hand out both models, or report which one is missing
    pub fn require_models(
        &self,
    ) -> Result<(Arc<dyn RegionDetector>, Arc<dyn RegionClassifier>), InferenceError> {
        match (&self.detector, &self.classifier) {
            (Some(d), Some(c)) => Ok((d.clone(), c.clone())),
            (None, Some(_)) => Err(InferenceError::ModelUnavailable(
                "detector model not loaded".to_string(),
            )),
            (Some(_), None) => Err(InferenceError::ModelUnavailable(
                "classifier model not loaded".to_string(),
            )),
            (None, None) => Err(InferenceError::ModelUnavailable(
                "detector and classifier models not loaded".to_string(),
            )),
        }
    }

    /// List both model slots with their availability
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        vec![
            VisionModelInfo {
                name: self
                    .detector
                    .as_ref()
                    .map(|d| d.name().to_string())
                    .unwrap_or_else(|| "yolov5-onnx".to_string()),
                model_type: "detector".to_string(),
                available: self.detector.is_some(),
            },
            VisionModelInfo {
                name: self
                    .classifier
                    .as_ref()
                    .map(|c| c.name().to_string())
                    .unwrap_or_else(|| "health-classifier-onnx".to_string()),
                model_type: "classifier".to_string(),
                available: self.classifier.is_some(),
            },
        ]
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Region classifier
//!
//! Assigns one of four health labels to a cropped bird. The pipeline only
//! depends on [`RegionClassifier`]; [`OnnxRegionClassifier`] backs it with
//! a Keras model exported to ONNX.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::errors::InferenceError;
use super::preprocessing::preprocess_for_classification;

/// Fixed label set of the health classifier, in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseLabel {
    Coccidiosis,
    Healthy,
    NewcastleDisease,
    Salmonella,
}

impl DiseaseLabel {
    pub const ALL: [DiseaseLabel; 4] = [
        DiseaseLabel::Coccidiosis,
        DiseaseLabel::Healthy,
        DiseaseLabel::NewcastleDisease,
        DiseaseLabel::Salmonella,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiseaseLabel::Coccidiosis => "Coccidiosis",
            DiseaseLabel::Healthy => "Healthy",
            DiseaseLabel::NewcastleDisease => "Newcastle Disease",
            DiseaseLabel::Salmonella => "Salmonella",
        }
    }
}

impl fmt::Display for DiseaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label and confidence for one crop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: DiseaseLabel,
    /// Maximum class probability (0.0-1.0)
    pub confidence: f32,
}

impl ClassificationResult {
    /// Pick the argmax label from raw model scores
    ///
    /// Scores that are not already a probability distribution are passed
    /// through softmax first. Ties resolve to the lowest index.
    pub fn from_scores(scores: &[f32]) -> Result<Self, InferenceError> {
        if scores.len() != DiseaseLabel::ALL.len() {
            return Err(InferenceError::UnexpectedOutput(format!(
                "classifier returned {} scores, expected {}",
                scores.len(),
                DiseaseLabel::ALL.len()
            )));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(InferenceError::UnexpectedOutput(
                "classifier returned non-finite scores".to_string(),
            ));
        }

        let probs = if is_distribution(scores) {
            scores.to_vec()
        } else {
            softmax(scores)
        };

        let (index, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best });

        let label = DiseaseLabel::from_index(index)
            .ok_or_else(|| InferenceError::UnexpectedOutput(format!("label index {}", index)))?;

        Ok(Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    /// Confidence as a percentage (0.0-100.0)
    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

fn is_distribution(scores: &[f32]) -> bool {
    let sum: f32 = scores.iter().sum();
    scores.iter().all(|s| *s >= 0.0) && (sum - 1.0).abs() < 1e-3
}

/// Numerically stable softmax
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::MIN, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Capability interface for crop classification
///
/// Callers must not pass an empty crop; implementations reject one with
/// [`InferenceError::InvalidCrop`].
pub trait RegionClassifier: Send + Sync {
    fn classify(&self, crop: &RgbImage) -> Result<ClassificationResult, InferenceError>;

    fn name(&self) -> &str {
        "region-classifier"
    }
}

/// Keras health classifier exported to ONNX, CPU only
pub struct OnnxRegionClassifier {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for OnnxRegionClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxRegionClassifier")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OnnxRegionClassifier {
    /// Load the classifier from an ONNX file
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Classifier model not found: {}", model_path.display());
        }

        info!("Loading classifier model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(2)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load classifier model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input_1".to_string());

        debug!("Classifier model input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }
}

impl RegionClassifier for OnnxRegionClassifier {
    fn classify(&self, crop: &RgbImage) -> Result<ClassificationResult, InferenceError> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(InferenceError::InvalidCrop {
                width: crop.width(),
                height: crop.height(),
            });
        }

        let input = preprocess_for_classification(crop);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Classifier session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Classification inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let scores: Vec<f32> = output.iter().copied().collect();
        ClassificationResult::from_scores(&scores)
    }

    fn name(&self) -> &str {
        "health-classifier-onnx"
    }
}

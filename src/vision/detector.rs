// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Region detector
//!
//! Locates birds in a full photo. The pipeline only depends on the
//! [`RegionDetector`] trait; [`OnnxRegionDetector`] backs it with a YOLOv5
//! ONNX export running on CPU.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ndarray::{ArrayView2, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::errors::InferenceError;
use super::preprocessing::{preprocess_for_detection, LetterboxInfo};

/// Opaque class index emitted by the detector
///
/// Only used to pick a stable box color; the label shown to users comes
/// from the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassTag(pub u32);

/// Candidate region produced by a [`RegionDetector`]
///
/// Coordinates are in source-image pixel space but may be fractional or
/// fall outside the image; [`DetectionBox::pixel_bounds`] gives the clamped
/// integer rectangle used for cropping and drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Detection confidence (0.0-1.0)
    pub confidence: f32,
    pub class_tag: ClassTag,
}

/// Integer pixel rectangle clamped to an image, end-exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelBounds {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// True when the rectangle collapsed to zero width or height
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl DetectionBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32, confidence: f32, class_tag: ClassTag) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            confidence: confidence.clamp(0.0, 1.0),
            class_tag,
        }
    }

    /// Truncate coordinates to whole pixels and clamp them to `width` x `height`
    pub fn pixel_bounds(&self, width: u32, height: u32) -> PixelBounds {
        let clamp = |v: f32, max: u32| -> u32 { (v as i64).clamp(0, max as i64) as u32 };
        PixelBounds {
            x0: clamp(self.x0, width),
            y0: clamp(self.y0, height),
            x1: clamp(self.x1, width),
            y1: clamp(self.y1, height),
        }
    }

    pub fn area(&self) -> f32 {
        (self.x1 - self.x0).max(0.0) * (self.y1 - self.y0).max(0.0)
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &DetectionBox) -> f32 {
        let ix0 = self.x0.max(other.x0);
        let iy0 = self.y0.max(other.y0);
        let ix1 = self.x1.min(other.x1);
        let iy1 = self.y1.min(other.y1);
        let inter = (ix1 - ix0).max(0.0) * (iy1 - iy0).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Capability interface for object detection
///
/// Implementations are loaded once at startup and shared read-only between
/// concurrent requests. An empty result is a valid "nothing found" outcome.
pub trait RegionDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectionBox>, InferenceError>;

    fn name(&self) -> &str {
        "region-detector"
    }
}

/// Post-processing parameters for the YOLO detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}

/// Decode raw YOLOv5 rows `[cx, cy, w, h, objectness, class scores...]`
///
/// Rows are in letterboxed space; returned boxes are mapped back to the
/// source image described by `info`.
pub fn decode_predictions(
    rows: ArrayView2<f32>,
    info: &LetterboxInfo,
    confidence_threshold: f32,
) -> Vec<DetectionBox> {
    let mut boxes = Vec::new();

    for row in rows.axis_iter(Axis(0)) {
        if row.len() < 6 {
            continue;
        }

        let objectness = row[4];
        let (class_index, class_score) = row
            .iter()
            .skip(5)
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (i, s)| if s > best.1 { (i, s) } else { best });

        let confidence = objectness * class_score;
        if confidence < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let (x0, y0) = info.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x1, y1) = info.map_to_original(cx + w / 2.0, cy + h / 2.0);

        boxes.push(DetectionBox::new(
            x0,
            y0,
            x1,
            y1,
            confidence,
            ClassTag(class_index as u32),
        ));
    }

    boxes
}

/// Greedy per-class non-maximum suppression
///
/// Output is ordered by descending confidence and capped at `max_detections`.
pub fn non_max_suppression(
    mut boxes: Vec<DetectionBox>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<DetectionBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<DetectionBox> = Vec::new();
    for candidate in boxes {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_tag == candidate.class_tag && k.iou(&candidate) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

/// YOLOv5 ONNX detector running on CPU
pub struct OnnxRegionDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    input_name: String,
    params: DetectorParams,
}

impl std::fmt::Debug for OnnxRegionDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxRegionDetector")
            .field("input_name", &self.input_name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl OnnxRegionDetector {
    /// Load the detector from an ONNX file
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime rejects it.
    pub async fn new<P: AsRef<Path>>(model_path: P, params: DetectorParams) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detector model not found: {}", model_path.display());
        }

        info!("Loading detector model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detector model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("Detector model input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            params,
        })
    }
}

impl RegionDetector for OnnxRegionDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectionBox>, InferenceError> {
        let (input, info) = preprocess_for_detection(image);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Detector session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // Expected shape: [1, N, 5 + classes]
        let shape = output.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 || shape[2] < 6 {
            return Err(InferenceError::UnexpectedOutput(format!(
                "detector output shape {:?}, expected [1, N, 5 + classes]",
                shape
            )));
        }

        let rows = output
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(|e| InferenceError::UnexpectedOutput(e.to_string()))?;

        let candidates = decode_predictions(rows, &info, self.params.confidence_threshold);
        let boxes = non_max_suppression(
            candidates,
            self.params.iou_threshold,
            self.params.max_detections,
        );

        debug!("Detected {} regions", boxes.len());

        Ok(boxes)
    }

    fn name(&self) -> &str {
        "yolov5-onnx"
    }
}

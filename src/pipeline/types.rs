// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Values produced by one pipeline run

use image::RgbImage;
use serde::Serialize;
use std::fmt;

use crate::vision::{ClassificationResult, DetectionBox, PixelBounds};

/// Stages of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Received,
    Detecting,
    NoDetections,
    ClassifyingEach,
    Annotating,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Received => "received",
            PipelineState::Detecting => "detecting",
            PipelineState::NoDetections => "no_detections",
            PipelineState::ClassifyingEach => "classifying_each",
            PipelineState::Annotating => "annotating",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a detection was left out of the summary and the drawing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Box clamped to zero width or height
    EmptyCrop,
    /// Classifier rejected this crop
    ClassifierFailed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DetectionOutcome {
    Classified(ClassificationResult),
    Skipped(SkipReason),
}

/// A detector box paired with what happened to its crop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedDetection {
    /// Position in detector output order
    pub index: usize,
    #[serde(skip)]
    pub detection: DetectionBox,
    pub bounds: PixelBounds,
    pub outcome: DetectionOutcome,
}

impl AnnotatedDetection {
    pub fn classification(&self) -> Option<&ClassificationResult> {
        match self.outcome {
            DetectionOutcome::Classified(ref result) => Some(result),
            DetectionOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, DetectionOutcome::Skipped(_))
    }
}

/// Output of one run
///
/// `annotated_image` is `None` when nothing was detected or every entry was
/// skipped; the count of `detections` always equals the detector's box count.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub annotated_image: Option<RgbImage>,
    pub detections: Vec<AnnotatedDetection>,
    pub summary_text: String,
}

impl PipelineResult {
    pub fn is_no_detections(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn classified_count(&self) -> usize {
        self.detections.iter().filter(|d| !d.is_skipped()).count()
    }

    pub fn has_classified(&self) -> bool {
        self.classified_count() > 0
    }
}

/// Sub-region of a source image selected by a detection box
pub struct Crop<'a> {
    source: &'a RgbImage,
    bounds: PixelBounds,
}

impl<'a> Crop<'a> {
    /// Clamp `detection` to `source` and borrow the covered region
    pub fn from_detection(source: &'a RgbImage, detection: &DetectionBox) -> Self {
        let bounds = detection.pixel_bounds(source.width(), source.height());
        Self { source, bounds }
    }

    pub fn bounds(&self) -> PixelBounds {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Copy the region into an owned image
    pub fn to_image(&self) -> RgbImage {
        image::imageops::crop_imm(
            self.source,
            self.bounds.x0,
            self.bounds.y0,
            self.bounds.width(),
            self.bounds.height(),
        )
        .to_image()
    }
}

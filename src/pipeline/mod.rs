// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection pipeline
//!
//! Turns one decoded photo into labeled detections, an annotated copy of the
//! photo and a summary text:
//!
//! `Received -> Detecting -> (NoDetections | ClassifyingEach) -> Annotating -> Done`
//!
//! `Failed` is reachable from any stage, but only for infrastructure errors.
//! A single bad box never fails the run.

pub mod errors;
pub mod formatter;
pub mod service;
pub mod storage;
pub mod types;

use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::vision::{
    class_color, Annotation, DetectionBox, ImageAnnotator, RegionClassifier, RegionDetector,
    VisionModelManager,
};

pub use errors::PipelineError;
pub use formatter::{display_label, ResultFormatter};
pub use service::{DetectionService, ImageJob};
pub use storage::{public_url, ResultStore, StoredResult, StoredUpload};
pub use types::{
    AnnotatedDetection, Crop, DetectionOutcome, PipelineResult, PipelineState, SkipReason,
};

/// Detector, classifier and annotator wired together
///
/// Holds only shared read-only handles, so one instance serves every
/// concurrent request.
pub struct DetectionPipeline {
    detector: Arc<dyn RegionDetector>,
    classifier: Arc<dyn RegionClassifier>,
    annotator: Arc<ImageAnnotator>,
    formatter: ResultFormatter,
}

impl DetectionPipeline {
    pub fn new(
        detector: Arc<dyn RegionDetector>,
        classifier: Arc<dyn RegionClassifier>,
        annotator: Arc<ImageAnnotator>,
    ) -> Self {
        Self {
            detector,
            classifier,
            annotator,
            formatter: ResultFormatter::new(),
        }
    }

    /// Build from loaded models; fails if either model is missing
    pub fn from_manager(
        manager: &VisionModelManager,
        annotator: Arc<ImageAnnotator>,
    ) -> Result<Self, PipelineError> {
        let (detector, classifier) = manager.require_models()?;
        Ok(Self::new(detector, classifier, annotator))
    }

    /// Run every stage on `image`, which is left untouched
    pub fn run(&self, image: &RgbImage) -> Result<PipelineResult, PipelineError> {
        let mut state = PipelineState::Received;
        debug!("Pipeline {} ({}x{})", state, image.width(), image.height());

        state = self.transition(state, PipelineState::Detecting);
        let boxes = match self.detector.detect(image) {
            Ok(boxes) => boxes,
            Err(e) => {
                warn!("Pipeline {} -> {}: {}", state, PipelineState::Failed, e);
                return Err(e.into());
            }
        };

        if boxes.is_empty() {
            self.transition(state, PipelineState::NoDetections);
            return Ok(PipelineResult {
                annotated_image: None,
                detections: Vec::new(),
                summary_text: self.formatter.no_detection_text().to_string(),
            });
        }

        state = self.transition(state, PipelineState::ClassifyingEach);
        let detections: Vec<AnnotatedDetection> = boxes
            .into_iter()
            .enumerate()
            .map(|(index, detection)| self.classify_one(image, index, detection))
            .collect();

        state = self.transition(state, PipelineState::Annotating);
        let annotations: Vec<Annotation> = detections
            .iter()
            .filter_map(|entry| {
                entry.classification().map(|result| Annotation {
                    detection: entry.detection.clone(),
                    label: display_label(result),
                    color: class_color(entry.detection.class_tag),
                })
            })
            .collect();

        let annotated_image = if annotations.is_empty() {
            None
        } else {
            Some(self.annotator.annotate(image, &annotations))
        };

        let summary_text = self.formatter.summarize(&detections);
        self.transition(state, PipelineState::Done);

        Ok(PipelineResult {
            annotated_image,
            detections,
            summary_text,
        })
    }

    fn classify_one(
        &self,
        image: &RgbImage,
        index: usize,
        detection: DetectionBox,
    ) -> AnnotatedDetection {
        let crop = Crop::from_detection(image, &detection);
        let bounds = crop.bounds();

        let outcome = if crop.is_empty() {
            debug!("Skipping box {}: empty crop {:?}", index, bounds);
            DetectionOutcome::Skipped(SkipReason::EmptyCrop)
        } else {
            match self.classifier.classify(&crop.to_image()) {
                Ok(result) => DetectionOutcome::Classified(result),
                Err(e) => {
                    warn!("Skipping box {}: classifier failed: {}", index, e);
                    DetectionOutcome::Skipped(SkipReason::ClassifierFailed(e.to_string()))
                }
            }
        };

        AnnotatedDetection {
            index,
            detection,
            bounds,
            outcome,
        }
    }

    fn transition(&self, from: PipelineState, to: PipelineState) -> PipelineState {
        debug!("Pipeline {} -> {}", from, to);
        to
    }
}

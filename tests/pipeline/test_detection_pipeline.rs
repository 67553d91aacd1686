// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detection pipeline tests
//!
//! These tests verify that DetectionPipeline::run:
//! - Stops at "nothing detected" without touching the classifier or annotator
//! - Keeps one entry per detector box, in detector order
//! - Skips degenerate crops and classifier failures without aborting
//! - Draws only classified boxes, colored by detector class

use crate::common::{detection, result, test_image, FakeClassifier, FakeDetector};
use flockscan::pipeline::formatter::{NO_DETECTION_TEXT, SUMMARY_HEADER};
use flockscan::pipeline::{DetectionOutcome, DetectionPipeline, PipelineError, SkipReason};
use flockscan::vision::{
    class_color, ClassTag, ClassificationResult, DiseaseLabel, ImageAnnotator, InferenceError,
    RegionClassifier, VisionModelManager,
};
use image::RgbImage;
use mockall::mock;
use std::sync::atomic::Ordering;
use std::sync::Arc;

mock! {
    pub Classifier {}
    impl RegionClassifier for Classifier {
        fn classify(&self, crop: &RgbImage) -> Result<ClassificationResult, InferenceError>;
    }
}

fn pipeline(detector: FakeDetector, classifier: Arc<dyn RegionClassifier>) -> DetectionPipeline {
    DetectionPipeline::new(
        Arc::new(detector),
        classifier,
        Arc::new(ImageAnnotator::without_font(4)),
    )
}

fn never_called() -> Arc<dyn RegionClassifier> {
    let mut mock = MockClassifier::new();
    mock.expect_classify().times(0);
    Arc::new(mock)
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

/// Test 1: One clear region yields one labeled box and one summary entry
#[test]
fn test_scenario_single_detection() {
    let image = test_image(200, 150);
    let classifier = Arc::new(FakeClassifier::returning(vec![result(
        DiseaseLabel::Coccidiosis,
        0.8765,
    )]));
    let pipeline = pipeline(
        FakeDetector::with_boxes(vec![detection(20.0, 30.0, 120.0, 110.0, 0.91, 2)]),
        classifier.clone(),
    );

    let result = pipeline.run(&image).unwrap();

    assert_eq!(result.detections.len(), 1);
    assert_eq!(result.classified_count(), 1);
    assert_eq!(
        result.summary_text,
        "Detection Results 🐣\n\nCoccidiosis\nConfidence 87.65%"
    );

    let annotated = result.annotated_image.expect("annotated image");
    assert_eq!(annotated.dimensions(), image.dimensions());
    assert_eq!(annotated.get_pixel(20, 60), &class_color(ClassTag(2)));
    assert_eq!(annotated.get_pixel(70, 70), image.get_pixel(70, 70));

    // Crop matches the clamped box
    assert_eq!(*classifier.crop_sizes.lock().unwrap(), vec![(100, 80)]);
}

/// Test 2: No boxes is a terminal outcome, not an error
#[test]
fn test_scenario_no_detections() {
    let image = test_image(64, 64);
    let pipeline = pipeline(FakeDetector::empty(), never_called());

    let result = pipeline.run(&image).unwrap();

    assert!(result.is_no_detections());
    assert!(result.detections.is_empty());
    assert!(result.annotated_image.is_none());
    assert_eq!(result.summary_text, NO_DETECTION_TEXT);
}

/// Test 3: A box collapsing to zero area is skipped, never classified
#[test]
fn test_scenario_degenerate_box_skipped() {
    let image = test_image(64, 64);
    let pipeline = pipeline(
        FakeDetector::with_boxes(vec![detection(10.2, 5.0, 10.9, 40.0, 0.7, 0)]),
        never_called(),
    );

    let result = pipeline.run(&image).unwrap();

    assert_eq!(result.detections.len(), 1);
    assert_eq!(
        result.detections[0].outcome,
        DetectionOutcome::Skipped(SkipReason::EmptyCrop)
    );
    assert_eq!(result.summary_text, SUMMARY_HEADER);
    // Nothing was drawn, so no image is produced
    assert!(result.annotated_image.is_none());
    assert!(!result.has_classified());
}

// =============================================================================
// Ordering and count invariants
// =============================================================================

/// Test 4: Every detector box produces exactly one entry, in input order
#[test]
fn test_count_and_order_preserved() {
    let image = test_image(100, 100);
    let boxes = vec![
        detection(0.0, 0.0, 30.0, 30.0, 0.30, 0),
        detection(50.0, 50.0, 50.0, 80.0, 0.95, 1), // zero width
        detection(40.0, 10.0, 90.0, 60.0, 0.60, 3),
        detection(150.0, 150.0, 180.0, 190.0, 0.80, 0), // outside image
        detection(-20.0, 70.0, 25.0, 130.0, 0.50, 7),   // clamped, still valid
    ];
    let classifier = Arc::new(FakeClassifier::returning(vec![
        result(DiseaseLabel::Healthy, 0.9),
        result(DiseaseLabel::Salmonella, 0.6),
        result(DiseaseLabel::NewcastleDisease, 0.7),
    ]));
    let pipeline = pipeline(FakeDetector::with_boxes(boxes.clone()), classifier.clone());

    let result = pipeline.run(&image).unwrap();

    assert_eq!(result.detections.len(), boxes.len());
    for (i, entry) in result.detections.iter().enumerate() {
        assert_eq!(entry.index, i);
        assert_eq!(entry.detection, boxes[i]);
    }

    let skipped: Vec<usize> = result
        .detections
        .iter()
        .filter(|d| d.is_skipped())
        .map(|d| d.index)
        .collect();
    assert_eq!(skipped, vec![1, 3]);

    // Classifier saw only the three valid crops, in detector order
    assert_eq!(
        *classifier.crop_sizes.lock().unwrap(),
        vec![(30, 30), (50, 50), (25, 30)]
    );
    assert_eq!(
        result.summary_text,
        "Detection Results 🐣\n\nHealthy\nConfidence 90.00%\n\n\
         Salmonella\nConfidence 60.00%\n\n\
         Newcastle Disease\nConfidence 70.00%"
    );
}

/// Test 5: Running twice on the same image gives identical output
#[test]
fn test_run_is_idempotent() {
    let image = test_image(120, 90);
    let pipeline = pipeline(
        FakeDetector::with_boxes(vec![
            detection(5.0, 5.0, 60.0, 60.0, 0.8, 0),
            detection(70.0, 10.0, 70.4, 50.0, 0.7, 1),
            detection(60.0, 30.0, 110.0, 85.0, 0.6, 4),
        ]),
        Arc::new(FakeClassifier::returning(vec![
            result(DiseaseLabel::Healthy, 0.55),
            result(DiseaseLabel::Coccidiosis, 0.75),
        ])),
    );

    let first = pipeline.run(&image).unwrap();
    let second = pipeline.run(&image).unwrap();

    assert_eq!(first.detections.len(), second.detections.len());
    for (a, b) in first.detections.iter().zip(&second.detections) {
        assert_eq!(a.index, b.index);
        assert_eq!(a.bounds, b.bounds);
        assert_eq!(a.is_skipped(), b.is_skipped());
    }
    assert_eq!(first.summary_text, second.summary_text);
    assert_eq!(first.annotated_image, second.annotated_image);
}

// =============================================================================
// Failure isolation
// =============================================================================

/// Test 6: A classifier error skips that box only
#[test]
fn test_classifier_failure_is_isolated() {
    let image = test_image(100, 100);
    let pipeline = pipeline(
        FakeDetector::with_boxes(vec![
            detection(0.0, 0.0, 40.0, 40.0, 0.9, 0),
            detection(50.0, 50.0, 90.0, 90.0, 0.8, 1),
        ]),
        Arc::new(FakeClassifier::healthy().failing_on(0)),
    );

    let result = pipeline.run(&image).unwrap();

    assert_eq!(result.detections.len(), 2);
    assert!(matches!(
        result.detections[0].outcome,
        DetectionOutcome::Skipped(SkipReason::ClassifierFailed(_))
    ));
    assert!(result.detections[1].classification().is_some());
    assert_eq!(
        result.summary_text,
        "Detection Results 🐣\n\nHealthy\nConfidence 90.00%"
    );
    assert!(result.annotated_image.is_some());
}

/// Test 7: An unavailable detector fails the request with ModelUnavailable
#[test]
fn test_detector_unavailable_fails_request() {
    let detector = FakeDetector::unavailable();
    let pipeline = DetectionPipeline::new(
        Arc::new(detector),
        never_called(),
        Arc::new(ImageAnnotator::without_font(4)),
    );

    let err = pipeline.run(&test_image(32, 32)).unwrap_err();
    assert!(matches!(err, PipelineError::ModelUnavailable(_)));
}

/// Test 8: Building from a manager without models is rejected up front
#[test]
fn test_from_manager_requires_models() {
    let manager = VisionModelManager::from_models(Some(Arc::new(FakeDetector::empty())), None);
    let result = DetectionPipeline::from_manager(&manager, Arc::new(ImageAnnotator::without_font(6)));
    assert!(matches!(result, Err(PipelineError::ModelUnavailable(_))));
}

// =============================================================================
// Annotation
// =============================================================================

/// Test 9: The source image is never modified
#[test]
fn test_source_image_untouched() {
    let image = test_image(80, 80);
    let before = image.clone();
    let pipeline = pipeline(
        FakeDetector::with_boxes(vec![detection(10.0, 10.0, 70.0, 70.0, 0.9, 5)]),
        Arc::new(FakeClassifier::healthy()),
    );

    let result = pipeline.run(&image).unwrap();

    assert_eq!(image, before);
    assert_ne!(result.annotated_image.unwrap(), before);
}

/// Test 10: Skipped boxes are not drawn
#[test]
fn test_skipped_boxes_not_drawn() {
    let image = RgbImage::new(100, 100);
    let pipeline = pipeline(
        FakeDetector::with_boxes(vec![
            detection(0.0, 0.0, 40.0, 40.0, 0.9, 0),
            detection(50.0, 50.0, 90.0, 90.0, 0.8, 1),
        ]),
        Arc::new(FakeClassifier::healthy().failing_on(1)),
    );

    let annotated = pipeline.run(&image).unwrap().annotated_image.unwrap();

    assert_eq!(annotated.get_pixel(0, 0), &class_color(ClassTag(0)));
    assert_eq!(annotated.get_pixel(50, 50), &image::Rgb([0, 0, 0]));
}

/// Test 11: Detector is called exactly once per run
#[test]
fn test_detector_called_once() {
    let detector = Arc::new(FakeDetector::with_boxes(vec![detection(
        0.0, 0.0, 10.0, 10.0, 0.9, 0,
    )]));
    let pipeline = DetectionPipeline::new(
        detector.clone(),
        Arc::new(FakeClassifier::healthy()),
        Arc::new(ImageAnnotator::without_font(2)),
    );

    pipeline.run(&test_image(20, 20)).unwrap();
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
}

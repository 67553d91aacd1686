// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Vision model manager tests
//!
//! Startup must never fail because a model file is missing; the manager
//! reports what loaded and hands out shared handles to what did.

use crate::common::{detection, test_image, FakeClassifier, FakeDetector};
use flockscan::vision::{
    DetectorParams, InferenceError, VisionModelConfig, VisionModelManager,
};
use std::sync::Arc;

/// Test 1: Missing model files degrade instead of failing startup
#[tokio::test]
async fn test_missing_files_degrade() {
    let config = VisionModelConfig {
        detector_model_path: Some("/nonexistent/detector.onnx".to_string()),
        classifier_model_path: Some("/nonexistent/classifier.onnx".to_string()),
        detector_params: DetectorParams::default(),
    };

    let manager = VisionModelManager::new(config)
        .await
        .expect("manager creation must not fail");

    assert!(!manager.is_ready());
    assert!(!manager.has_detector());
    assert!(!manager.has_classifier());
    match manager.require_models() {
        Err(InferenceError::ModelUnavailable(msg)) => {
            assert!(msg.contains("detector and classifier"))
        }
        other => panic!("expected ModelUnavailable, got {:?}", other.map(|_| ())),
    }
}

/// Test 2: Handles from a ready manager are shared, not copied
#[test]
fn test_ready_manager_shares_models() {
    let detector = Arc::new(FakeDetector::with_boxes(vec![detection(
        1.0, 1.0, 5.0, 5.0, 0.9, 0,
    )]));
    let manager = VisionModelManager::from_models(
        Some(detector.clone()),
        Some(Arc::new(FakeClassifier::healthy())),
    );

    assert!(manager.is_ready());
    let (d, c) = manager.require_models().unwrap();
    assert_eq!(d.name(), "fake-detector");
    assert_eq!(c.name(), "fake-classifier");

    let boxes = d.detect(&test_image(10, 10)).unwrap();
    assert_eq!(boxes.len(), 1);
    assert_eq!(Arc::strong_count(&detector), 3);
}

/// Test 3: Missing classifier alone is reported by name
#[test]
fn test_missing_classifier_reported() {
    let manager = VisionModelManager::from_models(Some(Arc::new(FakeDetector::empty())), None);
    assert!(manager.has_detector());
    assert!(!manager.has_classifier());

    let err = manager.require_models().map(|_| ()).unwrap_err();
    assert!(err.to_string().contains("classifier model not loaded"));

    let models = manager.list_models();
    assert_eq!(models[0].name, "fake-detector");
    assert!(models[0].available);
    assert!(!models[1].available);
}

/// Test 4: Real models, when present, produce boxes inside the image
#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_real_models_end_to_end() {
    let manager = VisionModelManager::new(VisionModelConfig::default())
        .await
        .unwrap();
    let Ok((detector, _classifier)) = manager.require_models() else {
        return;
    };

    let image = test_image(640, 480);
    for b in detector.detect(&image).unwrap() {
        assert!((0.0..=1.0).contains(&b.confidence));
    }
}

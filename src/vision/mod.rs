// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision module for CPU-based poultry health detection
//!
//! This module provides:
//! - Bird localisation via a YOLOv5 ONNX detector
//! - Health classification of each crop via an ONNX classifier
//! - Box and label drawing for the annotated result image
//!
//! Both models run on CPU through ONNX Runtime and are loaded once at
//! startup by [`VisionModelManager`].

pub mod annotate;
pub mod classifier;
pub mod detector;
pub mod errors;
pub mod image_utils;
pub mod model_manager;
pub mod preprocessing;

pub use annotate::{class_color, Annotation, AnnotatorConfig, ImageAnnotator};
pub use classifier::{ClassificationResult, DiseaseLabel, OnnxRegionClassifier, RegionClassifier};
pub use detector::{
    ClassTag, DetectionBox, DetectorParams, OnnxRegionDetector, PixelBounds, RegionDetector,
};
pub use errors::InferenceError;
pub use image_utils::{decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use model_manager::{VisionModelConfig, VisionModelInfo, VisionModelManager};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use flockscan::delivery::{DeliveryError, DeliveryGateway, OutboundMessage, UserProfile};
use flockscan::vision::{
    ClassTag, ClassificationResult, DetectionBox, DiseaseLabel, InferenceError, RegionClassifier,
    RegionDetector,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Detector returning a fixed box list
pub struct FakeDetector {
    boxes: Vec<DetectionBox>,
    unavailable: bool,
    pub calls: AtomicUsize,
}

impl FakeDetector {
    pub fn with_boxes(boxes: Vec<DetectionBox>) -> Self {
        Self {
            boxes,
            unavailable: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::with_boxes(Vec::new())
    }

    /// Behaves like a model that never loaded
    pub fn unavailable() -> Self {
        Self {
            boxes: Vec::new(),
            unavailable: true,
            calls: AtomicUsize::new(0),
        }
    }
}

impl RegionDetector for FakeDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectionBox>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(InferenceError::ModelUnavailable("fake detector".to_string()));
        }
        Ok(self.boxes.clone())
    }

    fn name(&self) -> &str {
        "fake-detector"
    }
}

/// Classifier cycling through fixed results and recording crop sizes
pub struct FakeClassifier {
    results: Vec<ClassificationResult>,
    fail_on_call: Option<usize>,
    pub crop_sizes: Mutex<Vec<(u32, u32)>>,
}

impl FakeClassifier {
    pub fn returning(results: Vec<ClassificationResult>) -> Self {
        Self {
            results,
            fail_on_call: None,
            crop_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::returning(vec![result(DiseaseLabel::Healthy, 0.9)])
    }

    /// Fail the `n`th call (zero-based) with a backend error
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    pub fn call_count(&self) -> usize {
        self.crop_sizes.lock().unwrap().len()
    }
}

impl RegionClassifier for FakeClassifier {
    fn classify(&self, crop: &RgbImage) -> Result<ClassificationResult, InferenceError> {
        let mut sizes = self.crop_sizes.lock().unwrap();
        let call = sizes.len();
        sizes.push(crop.dimensions());
        if self.fail_on_call == Some(call) {
            return Err(InferenceError::Backend(anyhow::anyhow!("fake classifier failure")));
        }
        Ok(self.results[call % self.results.len()])
    }

    fn name(&self) -> &str {
        "fake-classifier"
    }
}

/// Gateway that serves canned content and profiles, and records every reply and push
#[derive(Default)]
pub struct RecordingGateway {
    content: Mutex<HashMap<String, Vec<u8>>>,
    profiles: Mutex<HashMap<String, String>>,
    pub replies: Mutex<Vec<(String, Vec<OutboundMessage>)>>,
    pub pushes: Mutex<Vec<(String, Vec<OutboundMessage>)>>,
    pub fetches: AtomicUsize,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(self, message_id: &str, bytes: Vec<u8>) -> Self {
        self.content
            .lock()
            .unwrap()
            .insert(message_id.to_string(), bytes);
        self
    }

    pub fn with_profile(self, user_id: &str, display_name: &str) -> Self {
        self.profiles
            .lock()
            .unwrap()
            .insert(user_id.to_string(), display_name.to_string());
        self
    }

    pub fn pushes(&self) -> Vec<(String, Vec<OutboundMessage>)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<(String, Vec<OutboundMessage>)> {
        self.replies.lock().unwrap().clone()
    }

    /// Poll until `count` pushes were recorded or two seconds pass
    pub async fn wait_for_pushes(&self, count: usize) -> Vec<(String, Vec<OutboundMessage>)> {
        for _ in 0..200 {
            if self.pushes.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.pushes()
    }
}

#[async_trait]
impl DeliveryGateway for RecordingGateway {
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), DeliveryError> {
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages));
        Ok(())
    }

    async fn push(
        &self,
        recipient_id: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), DeliveryError> {
        self.pushes
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), messages));
        Ok(())
    }

    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>, DeliveryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.content
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .ok_or(DeliveryError::Status {
                status: 404,
                body: "not found".to_string(),
            })
    }

    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, DeliveryError> {
        let profiles = self.profiles.lock().unwrap();
        let display_name = profiles.get(user_id).ok_or(DeliveryError::Status {
            status: 404,
            body: "not found".to_string(),
        })?;
        Ok(UserProfile {
            display_name: display_name.clone(),
            user_id: user_id.to_string(),
            picture_url: None,
            status_message: None,
        })
    }
}

pub fn result(label: DiseaseLabel, confidence: f32) -> ClassificationResult {
    ClassificationResult { label, confidence }
}

pub fn detection(x0: f32, y0: f32, x1: f32, y1: f32, confidence: f32, tag: u32) -> DetectionBox {
    DetectionBox::new(x0, y0, x1, y1, confidence, ClassTag(tag))
}

/// Gradient test photo
pub fn test_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&test_image(width, height), ImageFormat::Jpeg)
}

/// File names currently in a directory
pub fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tensor preparation for the region detector and the health classifier

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array4;

/// Square input size of the YOLOv5 detector export
pub const DETECTOR_INPUT_SIZE: u32 = 640;

/// Square input size of the health classifier
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// Gray used to pad letterboxed detector input
pub const LETTERBOX_FILL: u8 = 114;

/// Resize filter used for every classifier crop
///
/// Fixed so the same crop always produces the same tensor.
pub const CLASSIFIER_FILTER: FilterType = FilterType::Triangle;

/// Geometry of a letterbox transform, used to map detector output back onto
/// the source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied to the source image
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Source image width
    pub original_width: u32,
    /// Source image height
    pub original_height: u32,
}

impl LetterboxInfo {
    /// Calculate letterbox geometry for an image of the given size
    pub fn new(width: u32, height: u32, target_size: u32) -> Self {
        if width == 0 || height == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                original_width: width,
                original_height: height,
            };
        }

        let scale = (target_size as f32 / width as f32).min(target_size as f32 / height as f32);
        let (new_w, new_h) = scaled_dims(width, height, scale);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width: width,
            original_height: height,
        }
    }

    /// Map a coordinate from letterboxed space back to source image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (orig_x, orig_y)
    }
}

fn scaled_dims(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let new_w = ((width as f32 * scale).round() as u32).max(1);
    let new_h = ((height as f32 * scale).round() as u32).max(1);
    (new_w, new_h)
}

/// Resize with aspect ratio preservation and pad to a square canvas
pub fn letterbox(image: &RgbImage, target_size: u32) -> (RgbImage, LetterboxInfo) {
    let info = LetterboxInfo::new(image.width(), image.height(), target_size);
    let mut output = RgbImage::from_pixel(
        target_size,
        target_size,
        Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]),
    );

    if image.width() == 0 || image.height() == 0 {
        return (output, info);
    }

    let (new_w, new_h) = scaled_dims(image.width(), image.height(), info.scale);
    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    imageops::replace(
        &mut output,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );

    (output, info)
}

/// Preprocess a full image for the detector
///
/// Steps:
/// 1. Letterbox to DETECTOR_INPUT_SIZE with gray padding
/// 2. Scale pixels to [0, 1]
/// 3. Convert to NCHW tensor format [1, 3, 640, 640]
pub fn preprocess_for_detection(image: &RgbImage) -> (Array4<f32>, LetterboxInfo) {
    let (boxed, info) = letterbox(image, DETECTOR_INPUT_SIZE);
    let size = DETECTOR_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in boxed.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, info)
}

/// Preprocess a crop for the classifier
///
/// Steps:
/// 1. Resize to 224x224 with CLASSIFIER_FILTER (aspect ratio not preserved)
/// 2. Scale pixels to [0, 1]
/// 3. Convert to NHWC tensor format [1, 224, 224, 3]
pub fn preprocess_for_classification(crop: &RgbImage) -> Array4<f32> {
    let resized = imageops::resize(
        crop,
        CLASSIFIER_INPUT_SIZE,
        CLASSIFIER_INPUT_SIZE,
        CLASSIFIER_FILTER,
    );
    let size = CLASSIFIER_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, size, size, 3));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
        }
    }

    tensor
}

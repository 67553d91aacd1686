// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::vision::{ImageError, InferenceError};

/// Failures that abort one request
///
/// None of these is fatal to the process.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Failed to decode upload: {0}")]
    Decode(#[from] ImageError),

    #[error("Detection failed: {0}")]
    Detection(InferenceError),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write result image: {0}")]
    ImageWrite(#[from] image::ImageError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Pipeline worker failed: {0}")]
    Worker(String),
}

impl From<InferenceError> for PipelineError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ModelUnavailable(msg) => PipelineError::ModelUnavailable(msg),
            other => PipelineError::Detection(other),
        }
    }
}

impl PipelineError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PipelineError::ModelUnavailable(_))
    }
}

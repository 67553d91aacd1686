// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Errors raised at the detector/classifier seam

use thiserror::Error;

/// Failure modes shared by every region detector and classifier
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The backing model never loaded; the service is degraded
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Crop has zero area and cannot be classified
    #[error("Invalid crop: {width}x{height} has no area")]
    InvalidCrop { width: u32, height: u32 },

    /// Model produced output that does not match its contract
    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),

    /// Runtime failure inside the inference backend
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

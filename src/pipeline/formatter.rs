// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User-facing text for pipeline outcomes

use super::errors::PipelineError;
use super::types::{AnnotatedDetection, PipelineResult};
use crate::delivery::OutboundMessage;
use crate::vision::ClassificationResult;

pub const ACKNOWLEDGMENT_TEXT: &str = "Please wait, we are detecting! 🕵️‍♂️";
pub const SUMMARY_HEADER: &str = "Detection Results 🐣";
pub const NO_DETECTION_TEXT: &str = "Sorry, we cannot detect it. Please upload it again! 🐔";
pub const UNAVAILABLE_TEXT: &str =
    "Sorry, the detection service is unavailable right now. Please try again later.";
pub const FAILURE_TEXT: &str =
    "Sorry, something went wrong while processing your image. Please try again.";

/// Label drawn next to a box on the annotated image
pub fn display_label(result: &ClassificationResult) -> String {
    format!("{}: {:.2}%", result.label, result.confidence_percent())
}

#[derive(Debug, Clone, Default)]
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Header followed by one entry per classified detection, in order
    ///
    /// Skipped detections contribute nothing, so an all-skipped run yields
    /// just the header.
    pub fn summarize(&self, detections: &[AnnotatedDetection]) -> String {
        let mut text = format!("{}\n\n", SUMMARY_HEADER);
        for result in detections.iter().filter_map(|d| d.classification()) {
            text.push_str(&format!(
                "{}\nConfidence {:.2}%\n\n",
                result.label,
                result.confidence_percent()
            ));
        }
        text.trim().to_string()
    }

    pub fn acknowledgment(&self) -> OutboundMessage {
        OutboundMessage::text(ACKNOWLEDGMENT_TEXT)
    }

    pub fn no_detection_text(&self) -> &'static str {
        NO_DETECTION_TEXT
    }

    pub fn failure_message(&self, err: &PipelineError) -> &'static str {
        if err.is_unavailable() {
            UNAVAILABLE_TEXT
        } else {
            FAILURE_TEXT
        }
    }

    /// Push payload for a finished run
    ///
    /// Exactly one text item, then one image item when `image_url` is given.
    pub fn result_messages(
        &self,
        result: &PipelineResult,
        image_url: Option<&str>,
    ) -> Vec<OutboundMessage> {
        let mut messages = vec![OutboundMessage::text(result.summary_text.clone())];
        if let Some(url) = image_url {
            messages.push(OutboundMessage::image(url));
        }
        messages
    }
}

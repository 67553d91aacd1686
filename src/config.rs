// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process configuration loaded from environment variables

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::delivery::line_client::{DEFAULT_API_BASE_URL, DEFAULT_DATA_API_BASE_URL};
use crate::delivery::LineClientConfig;
use crate::vision::annotate::DEFAULT_LINE_WIDTH;
use crate::vision::{AnnotatorConfig, DetectorParams, VisionModelConfig};

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Webhook signing secret
    pub channel_secret: String,
    /// Bearer token for the messaging API
    pub channel_access_token: String,
    pub listen_addr: SocketAddr,
    /// Public URL of this service; derived per request when unset
    pub public_base_url: Option<String>,
    /// Directory served under /static
    pub static_dir: PathBuf,
    pub detector_model_path: String,
    pub classifier_model_path: String,
    pub detector_params: DetectorParams,
    pub annotation_line_width: u32,
    pub annotation_font_path: Option<PathBuf>,
    /// Seconds a result image stays served; 0 keeps them forever
    pub result_retention_secs: u64,
    pub api_base_url: String,
    pub data_api_base_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            channel_secret: String::new(),
            channel_access_token: String::new(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            public_base_url: None,
            static_dir: PathBuf::from("./static"),
            detector_model_path: "./models/detector.onnx".to_string(),
            classifier_model_path: "./models/classifier.onnx".to_string(),
            detector_params: DetectorParams::default(),
            annotation_line_width: DEFAULT_LINE_WIDTH,
            annotation_font_path: None,
            result_retention_secs: 24 * 60 * 60,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            data_api_base_url: DEFAULT_DATA_API_BASE_URL.to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{} has an invalid value: {}", name, v)),
        _ => Ok(None),
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl BotConfig {
    /// Load configuration from environment variables
    ///
    /// `LINE_CHANNEL_SECRET` and `LINE_CHANNEL_ACCESS_TOKEN` are required.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let channel_secret = non_empty_env("LINE_CHANNEL_SECRET")
            .ok_or_else(|| "Specify LINE_CHANNEL_SECRET as environment variable.".to_string())?;
        let channel_access_token = non_empty_env("LINE_CHANNEL_ACCESS_TOKEN").ok_or_else(|| {
            "Specify LINE_CHANNEL_ACCESS_TOKEN as environment variable.".to_string()
        })?;

        let detector_params = DetectorParams {
            confidence_threshold: parse_env("DETECTION_CONFIDENCE")?
                .unwrap_or(defaults.detector_params.confidence_threshold),
            iou_threshold: parse_env("DETECTION_IOU")?
                .unwrap_or(defaults.detector_params.iou_threshold),
            max_detections: parse_env("DETECTION_MAX")?
                .unwrap_or(defaults.detector_params.max_detections),
        };

        let config = Self {
            channel_secret,
            channel_access_token,
            listen_addr: parse_env("LISTEN_ADDR")?.unwrap_or(defaults.listen_addr),
            public_base_url: non_empty_env("PUBLIC_BASE_URL"),
            static_dir: non_empty_env("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            detector_model_path: non_empty_env("DETECTOR_MODEL_PATH")
                .unwrap_or(defaults.detector_model_path),
            classifier_model_path: non_empty_env("CLASSIFIER_MODEL_PATH")
                .unwrap_or(defaults.classifier_model_path),
            detector_params,
            annotation_line_width: parse_env("ANNOTATION_LINE_WIDTH")?
                .unwrap_or(defaults.annotation_line_width),
            annotation_font_path: non_empty_env("ANNOTATION_FONT_PATH").map(PathBuf::from),
            result_retention_secs: parse_env("RESULT_RETENTION_SECS")?
                .unwrap_or(defaults.result_retention_secs),
            api_base_url: non_empty_env("LINE_API_BASE_URL").unwrap_or(defaults.api_base_url),
            data_api_base_url: non_empty_env("LINE_DATA_API_BASE_URL")
                .unwrap_or(defaults.data_api_base_url),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.channel_secret.trim().is_empty() {
            return Err("Channel secret must not be empty".to_string());
        }
        if self.channel_access_token.trim().is_empty() {
            return Err("Channel access token must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.detector_params.confidence_threshold) {
            return Err(format!(
                "Detection confidence must be within [0, 1], got {}",
                self.detector_params.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.detector_params.iou_threshold) {
            return Err(format!(
                "Detection IoU threshold must be within [0, 1], got {}",
                self.detector_params.iou_threshold
            ));
        }
        if self.detector_params.max_detections == 0 {
            return Err("Maximum detections must be greater than 0".to_string());
        }
        if self.annotation_line_width == 0 {
            return Err("Annotation line width must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn vision_model_config(&self) -> VisionModelConfig {
        VisionModelConfig {
            detector_model_path: Some(self.detector_model_path.clone()),
            classifier_model_path: Some(self.classifier_model_path.clone()),
            detector_params: self.detector_params,
        }
    }

    pub fn annotator_config(&self) -> AnnotatorConfig {
        AnnotatorConfig {
            line_width: self.annotation_line_width,
            font_path: self.annotation_font_path.clone(),
            ..AnnotatorConfig::default()
        }
    }

    /// Age after which result images are deleted, if they expire at all
    pub fn result_retention(&self) -> Option<Duration> {
        (self.result_retention_secs > 0).then(|| Duration::from_secs(self.result_retention_secs))
    }

    pub fn line_client_config(&self) -> LineClientConfig {
        let mut config = LineClientConfig::new(self.channel_access_token.clone());
        config.api_base_url = self.api_base_url.clone();
        config.data_api_base_url = self.data_api_base_url.clone();
        config
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! LINE Messaging API client

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{DeliveryError, DeliveryGateway, OutboundMessage, UserProfile};
use crate::vision::image_utils::MAX_IMAGE_SIZE;

pub const DEFAULT_API_BASE_URL: &str = "https://api.line.me";
pub const DEFAULT_DATA_API_BASE_URL: &str = "https://api-data.line.me";

#[derive(Debug, Clone)]
pub struct LineClientConfig {
    pub channel_access_token: String,
    /// Host for reply and push
    pub api_base_url: String,
    /// Host for message content downloads
    pub data_api_base_url: String,
    pub timeout: Duration,
    /// Largest message content accepted for download
    pub max_content_bytes: u64,
}

impl LineClientConfig {
    pub fn new(channel_access_token: impl Into<String>) -> Self {
        Self {
            channel_access_token: channel_access_token.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            data_api_base_url: DEFAULT_DATA_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_content_bytes: MAX_IMAGE_SIZE as u64,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [OutboundMessage],
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [OutboundMessage],
}

/// Bearer-authenticated client for the LINE bot endpoints
pub struct LineMessagingClient {
    client: Client,
    access_token: String,
    api_base_url: String,
    data_api_base_url: String,
    max_content_bytes: u64,
}

impl LineMessagingClient {
    pub fn new(config: LineClientConfig) -> Result<Self, DeliveryError> {
        if config.channel_access_token.trim().is_empty() {
            return Err(DeliveryError::InvalidConfig(
                "channel access token must not be empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        let api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        let data_api_base_url = config.data_api_base_url.trim_end_matches('/').to_string();
        info!(
            "LINE client configured: api={}, data_api={}",
            api_base_url, data_api_base_url
        );

        Ok(Self {
            client,
            access_token: config.channel_access_token,
            api_base_url,
            data_api_base_url,
            max_content_bytes: config.max_content_bytes,
        })
    }

    pub fn reply_url(&self) -> String {
        format!("{}/v2/bot/message/reply", self.api_base_url)
    }

    pub fn push_url(&self) -> String {
        format!("{}/v2/bot/message/push", self.api_base_url)
    }

    pub fn content_url(&self, message_id: &str) -> String {
        format!("{}/v2/bot/message/{}/content", self.data_api_base_url, message_id)
    }

    pub fn profile_url(&self, user_id: &str) -> String {
        format!("{}/v2/bot/profile/{}", self.api_base_url, user_id)
    }

    fn check_content_size(&self, size: u64) -> Result<(), DeliveryError> {
        if size > self.max_content_bytes {
            return Err(DeliveryError::ContentTooLarge {
                size,
                max: self.max_content_bytes,
            });
        }
        Ok(())
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<(), DeliveryError> {
        debug!("LINE POST {}", url);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DeliveryError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(DeliveryError::Status { status, body })
}

#[async_trait]
impl DeliveryGateway for LineMessagingClient {
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), DeliveryError> {
        let body = ReplyRequest {
            reply_token,
            messages: &messages,
        };
        self.post_json(&self.reply_url(), &body).await
    }

    async fn push(
        &self,
        recipient_id: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), DeliveryError> {
        let body = PushRequest {
            to: recipient_id,
            messages: &messages,
        };
        self.post_json(&self.push_url(), &body).await
    }

    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>, DeliveryError> {
        let url = self.content_url(message_id);
        debug!("LINE GET {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let response = check_status(response).await?;

        // Refuse oversized bodies before buffering them
        if let Some(length) = response.content_length() {
            self.check_content_size(length)?;
        }
        let bytes = response.bytes().await?;
        self.check_content_size(bytes.len() as u64)?;
        Ok(bytes.to_vec())
    }

    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, DeliveryError> {
        let url = self.profile_url(user_id);
        debug!("LINE GET {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<UserProfile>().await?)
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Delivery of acknowledgments and results back to chat users

pub mod line_client;
pub mod messages;

use async_trait::async_trait;
use thiserror::Error;

pub use line_client::{LineClientConfig, LineMessagingClient};
pub use messages::{OutboundMessage, UserProfile};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Messaging API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Message content is {size} bytes, limit is {max}")]
    ContentTooLarge { size: u64, max: u64 },

    #[error("Invalid delivery configuration: {0}")]
    InvalidConfig(String),
}

/// Outbound side of the messaging platform
///
/// `reply` answers the triggering event through its one-shot token; `push`
/// sends to a recipient at any later time.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), DeliveryError>;

    async fn push(
        &self,
        recipient_id: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), DeliveryError>;

    /// Download the binary content attached to an inbound message
    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>, DeliveryError>;

    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, DeliveryError>;
}

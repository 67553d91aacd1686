// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Webhook request body types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub package_id: Option<String>,
    #[serde(default)]
    pub sticker_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Fields of an image message event needed to drive detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEvent {
    pub reply_token: String,
    pub user_id: Option<String>,
    pub message_id: String,
}

/// Non-image message content the bot answers in place
#[derive(Debug, Clone, PartialEq)]
pub enum ChatContent {
    Text(String),
    Sticker {
        package_id: String,
        sticker_id: String,
    },
    Location {
        address: String,
        latitude: f64,
        longitude: f64,
    },
}

/// A text, sticker or location message with what is needed to reply
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    pub reply_token: String,
    /// Set only for one-to-one chats, where the profile API may be used
    pub user_id: Option<String>,
    pub content: ChatContent,
}

impl WebhookEvent {
    /// Text, sticker and location message events; everything else is `None`
    pub fn as_chat_event(&self) -> Option<ChatEvent> {
        if self.event_type != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        let content = match message.message_type.as_str() {
            "text" => ChatContent::Text(message.text.clone()?),
            "sticker" => ChatContent::Sticker {
                package_id: message.package_id.clone()?,
                sticker_id: message.sticker_id.clone()?,
            },
            "location" => ChatContent::Location {
                address: message.address.clone().unwrap_or_default(),
                latitude: message.latitude?,
                longitude: message.longitude?,
            },
            _ => return None,
        };
        let user_id = self
            .source
            .as_ref()
            .filter(|s| s.source_type == "user")
            .and_then(|s| s.user_id.clone());
        Some(ChatEvent {
            reply_token: self.reply_token.clone()?,
            user_id,
            content,
        })
    }

    /// Image message events only; everything else is `None`
    pub fn as_image_event(&self) -> Option<ImageEvent> {
        if self.event_type != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.message_type != "image" {
            return None;
        }
        Some(ImageEvent {
            reply_token: self.reply_token.clone()?,
            user_id: self.source.as_ref().and_then(|s| s.user_id.clone()),
            message_id: message.id.clone(),
        })
    }
}

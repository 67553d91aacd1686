// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Immediate replies to text, sticker and location messages

use crate::delivery::{DeliveryError, DeliveryGateway, OutboundMessage};

use super::events::{ChatContent, ChatEvent};

/// Text that asks the bot for the sender's display name
pub const PROFILE_COMMAND: &str = "profile";
pub const PROFILE_UNAVAILABLE_TEXT: &str = "Bot can't use profile API without user ID";
/// Title on echoed location pins
pub const LOCATION_TITLE: &str = "Location";

/// Build the reply for a chat message
///
/// Text is echoed, except the profile command which answers with the
/// sender's display name. Stickers and locations are sent back as-is.
pub async fn chat_reply(
    gateway: &dyn DeliveryGateway,
    event: &ChatEvent,
) -> Result<OutboundMessage, DeliveryError> {
    let message = match &event.content {
        ChatContent::Text(text) if text == PROFILE_COMMAND => match event.user_id {
            Some(ref user_id) => {
                let profile = gateway.get_profile(user_id).await?;
                OutboundMessage::text(format!("Display name: {}", profile.display_name))
            }
            None => OutboundMessage::text(PROFILE_UNAVAILABLE_TEXT),
        },
        ChatContent::Text(text) => OutboundMessage::text(text.clone()),
        ChatContent::Sticker {
            package_id,
            sticker_id,
        } => OutboundMessage::sticker(package_id.clone(), sticker_id.clone()),
        ChatContent::Location {
            address,
            latitude,
            longitude,
        } => OutboundMessage::location(LOCATION_TITLE, address.clone(), *latitude, *longitude),
    };
    Ok(message)
}

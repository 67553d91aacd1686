// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Messaging platform webhook

pub mod events;
pub mod handler;
pub mod replies;

pub use events::{
    ChatContent, ChatEvent, EventMessage, EventSource, ImageEvent, WebhookEvent, WebhookPayload,
};
pub use handler::{callback_handler, request_base_url};
pub use replies::{chat_reply, PROFILE_COMMAND, PROFILE_UNAVAILABLE_TEXT};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! POST /callback

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use tracing::{debug, info, warn};

use super::events::{ChatEvent, WebhookPayload};
use super::replies::chat_reply;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::signature::{verify_signature, SIGNATURE_HEADER};
use crate::pipeline::ImageJob;

/// Verify, answer chat messages, acknowledge every image event, and hand
/// detection off to a background task
///
/// Returns as soon as replies are sent; detection results arrive later by push.
pub async fn callback_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Webhook request without signature header");
            ApiError::InvalidSignature
        })?;

    if !verify_signature(&state.channel_secret, &body, signature) {
        warn!("Invalid webhook signature. Please check your channel access token/channel secret.");
        return Err(ApiError::InvalidSignature);
    }

    debug!("Request body: {}", String::from_utf8_lossy(&body));

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("malformed webhook body: {}", e)))?;

    let base_url = request_base_url(state.public_base_url.as_deref(), &headers);

    for event in &payload.events {
        if let Some(chat) = event.as_chat_event() {
            reply_to_chat(&state, &chat).await;
            continue;
        }

        let Some(image) = event.as_image_event() else {
            debug!("Ignoring {} event", event.event_type);
            continue;
        };

        if let Err(e) = state.service.acknowledge(&image.reply_token).await {
            warn!("Failed to acknowledge message {}: {}", image.message_id, e);
        }

        let Some(user_id) = image.user_id else {
            warn!(
                "Image message {} has no user id; result cannot be pushed",
                image.message_id
            );
            continue;
        };

        info!("Queued detection for message {}", image.message_id);
        state.service.spawn(ImageJob {
            recipient_id: user_id,
            message_id: image.message_id,
            base_url: base_url.clone(),
        });
    }

    Ok("OK")
}

async fn reply_to_chat(state: &AppState, chat: &ChatEvent) {
    let message = match chat_reply(state.gateway.as_ref(), chat).await {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to build reply: {}", e);
            return;
        }
    };
    if let Err(e) = state.gateway.reply(&chat.reply_token, vec![message]).await {
        warn!("Failed to send reply: {}", e);
    }
}

/// Public base URL result images are served from
///
/// A configured URL wins; otherwise it is rebuilt from forwarded proxy
/// headers, then the plain `Host` header.
pub fn request_base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(url) = configured {
        return url.trim_end_matches('/').to_string();
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let proto = header("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
    let host = header("x-forwarded-host")
        .or_else(|| header("host"))
        .unwrap_or_else(|| "localhost".to_string());

    format!("{}://{}", proto, host)
}

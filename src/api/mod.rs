// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod http_server;
pub mod signature;
pub mod webhook;

pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_router, start_server, AppState, HealthResponse};
pub use signature::{compute_signature, verify_signature, SIGNATURE_HEADER};
pub use webhook::{callback_handler, WebhookPayload};

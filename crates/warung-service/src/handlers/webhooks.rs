//! Gateway webhook handler.
//!
//! The gateway retries any callback that is not acknowledged, so this
//! handler returns the same success body in every case, including events it
//! drops. All real decisions happen in the engine.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::engine::CallbackEvent;
use crate::state::AppState;

/// QRIS callback payload.
///
/// Field names vary between gateway versions; the reference id may arrive
/// under any of three keys, and the signature may arrive in the body or the
/// `x-callback-signature` header.
#[derive(Debug, Deserialize)]
pub struct QrisCallback {
    /// Reference id, current field name.
    #[serde(default)]
    pub ref_kode: Option<String>,
    /// Reference id, older field name.
    #[serde(default)]
    pub ref_id: Option<String>,
    /// Reference id, oldest field name.
    #[serde(default, rename = "ref")]
    pub ref_short: Option<String>,
    /// Payment status, case-insensitive.
    #[serde(default)]
    pub status: Option<String>,
    /// HMAC signature in the body.
    #[serde(default)]
    pub signature: Option<String>,
}

/// Webhook acknowledgement. Always the same, by protocol.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    /// Always true.
    pub status: bool,
}

/// Handle a QRIS gateway payment callback.
pub async fn qris_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<QrisCallback>, JsonRejection>,
) -> Json<CallbackAck> {
    let ack = Json(CallbackAck { status: true });

    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Callback with undecodable body");
            return ack;
        }
    };

    let Some(ref_id) = body.ref_kode.or(body.ref_id).or(body.ref_short) else {
        tracing::warn!("Callback without a reference id");
        return ack;
    };

    let signature = body.signature.or_else(|| {
        headers
            .get("x-callback-signature")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    });

    let source_ip = client_ip(&headers);

    let event = CallbackEvent {
        ref_id,
        status: body.status.unwrap_or_default().to_ascii_uppercase(),
        signature,
        source_ip,
    };

    match state.engine.handle_callback(&event).await {
        Ok(disposition) => {
            tracing::info!(
                ref_id = %event.ref_id,
                disposition = disposition.describe(),
                "Callback processed"
            );
        }
        Err(e) => {
            tracing::error!(ref_id = %event.ref_id, error = %e, "Callback processing failed");
        }
    }

    ack
}

/// Extract the originating client address from proxy headers.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
}

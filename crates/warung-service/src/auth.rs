//! Caller authentication for the service surface.
//!
//! Every route under `/v1` requires the shared service API key in
//! `x-api-key`. The surface is consumed by the trusted chat dispatcher,
//! not by buyers directly, so a single symmetric key is enough. The
//! health check and the gateway webhook sit outside this extractor; the
//! webhook carries its own HMAC and IP checks.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use warung_core::signature::constant_time_eq;

use crate::error::ApiError;
use crate::state::AppState;

fn header_str<'p>(parts: &'p Parts, name: &str) -> Option<&'p str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Proof that the request presented the service API key.
#[derive(Debug, Clone, Copy)]
pub struct ServiceAuth;

impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            // An unset key means the surface is closed, not open.
            let expected = state
                .config
                .service_api_key
                .as_deref()
                .ok_or(ApiError::Unauthorized)?;

            let presented = header_str(parts, "x-api-key").ok_or(ApiError::Unauthorized)?;

            if !constant_time_eq(presented, expected) {
                return Err(ApiError::Unauthorized);
            }

            Ok(ServiceAuth)
        })
    }
}

//! Operational settings handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use warung_core::Setting;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// A setting rendered for API consumers.
#[derive(Debug, Serialize)]
pub struct SettingResponse {
    /// Unique key.
    pub key: String,
    /// Current value.
    pub value: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl From<&Setting> for SettingResponse {
    fn from(setting: &Setting) -> Self {
        Self {
            key: setting.key.clone(),
            value: setting.value.clone(),
            updated_at: setting.updated_at.to_rfc3339(),
        }
    }
}

/// Get a setting by key.
pub async fn get_setting(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(key): Path<String>,
) -> Result<Json<SettingResponse>, ApiError> {
    let setting = state
        .store
        .get_setting(&key)?
        .ok_or_else(|| ApiError::NotFound(format!("setting not found: {key}")))?;
    Ok(Json(SettingResponse::from(&setting)))
}

/// Value to store under the keyed setting.
#[derive(Debug, Deserialize)]
pub struct PutSettingRequest {
    /// The new value.
    pub value: String,
}

/// Insert or update a setting.
pub async fn put_setting(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(key): Path<String>,
    Json(body): Json<PutSettingRequest>,
) -> Result<Json<SettingResponse>, ApiError> {
    let setting = Setting::new(key, body.value);
    state.store.put_setting(&setting)?;
    tracing::info!(key = %setting.key, "Setting updated");
    Ok(Json(SettingResponse::from(&setting)))
}

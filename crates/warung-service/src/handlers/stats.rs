//! Dashboard statistics handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use warung_store::LedgerCounts;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Aggregate statistics for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Whether gateway payments are available.
    pub gateway_enabled: bool,
    /// Entity counts from the ledger.
    #[serde(flatten)]
    pub counts: LedgerCounts,
}

/// Get aggregate ledger counts.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
) -> Result<Json<StatsResponse>, ApiError> {
    let counts = state.store.counts()?;
    Ok(Json(StatsResponse {
        gateway_enabled: state.has_gateway(),
        counts,
    }))
}

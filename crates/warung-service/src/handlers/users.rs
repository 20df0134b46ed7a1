//! Buyer account handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use warung_core::{User, UserId};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::handlers::checkout::TransactionResponse;
use crate::state::AppState;

/// A buyer account rendered for API consumers.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// Platform id.
    pub user_id: i64,
    /// Display name.
    pub display_name: String,
    /// Current balance.
    pub balance: i64,
    /// Lifetime settled transactions.
    pub total_transactions: u64,
    /// First interaction timestamp.
    pub joined_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.as_i64(),
            display_name: user.display_name.clone(),
            balance: user.balance,
            total_transactions: user.total_transactions,
            joined_at: user.joined_at.to_rfc3339(),
        }
    }
}

/// Ensure-user request, sent on every buyer interaction.
#[derive(Debug, Deserialize)]
pub struct EnsureUserRequest {
    /// Platform id.
    pub user_id: i64,
    /// Current display name; refreshed if it changed.
    pub display_name: String,
}

/// Get or lazily create a buyer account.
pub async fn ensure_user(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<EnsureUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .ensure_user(UserId::new(body.user_id), &body.display_name)?;
    Ok(Json(UserResponse::from(&user)))
}

/// List of buyer ids, the broadcast fan-out source.
#[derive(Debug, Serialize)]
pub struct UserIdsResponse {
    /// Every known buyer id.
    pub user_ids: Vec<i64>,
}

/// List every known buyer id.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
) -> Result<Json<UserIdsResponse>, ApiError> {
    let user_ids = state
        .store
        .list_user_ids()?
        .into_iter()
        .map(UserId::as_i64)
        .collect();
    Ok(Json(UserIdsResponse { user_ids }))
}

/// Get a buyer account.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .get_user(UserId::new(id))?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {id}")))?;
    Ok(Json(UserResponse::from(&user)))
}

/// Admin balance adjustment: a signed delta.
#[derive(Debug, Deserialize)]
pub struct AdjustBalanceRequest {
    /// Amount to add (positive) or remove (negative).
    pub delta: i64,
}

/// Balance adjustment response.
#[derive(Debug, Serialize)]
pub struct AdjustBalanceResponse {
    /// Balance after the adjustment.
    pub balance: i64,
}

/// Apply a signed balance delta to a buyer account.
pub async fn adjust_balance(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(id): Path<i64>,
    Json(body): Json<AdjustBalanceRequest>,
) -> Result<Json<AdjustBalanceResponse>, ApiError> {
    if body.delta == 0 {
        return Err(ApiError::BadRequest("delta must be non-zero".into()));
    }
    let balance = state.store.adjust_balance(UserId::new(id), body.delta)?;
    tracing::info!(user_id = id, delta = body.delta, balance, "Balance adjusted");
    Ok(Json(AdjustBalanceResponse { balance }))
}

/// History pagination parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum rows to return (default 20, capped at 100).
    pub limit: Option<usize>,
    /// Rows to skip.
    pub offset: Option<usize>,
}

/// List a buyer's transactions, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let limit = query.limit.unwrap_or(20).min(100);
    let offset = query.offset.unwrap_or(0);
    let rows = state
        .store
        .list_transactions_by_user(UserId::new(id), limit, offset)?;
    Ok(Json(rows.iter().map(TransactionResponse::from).collect()))
}

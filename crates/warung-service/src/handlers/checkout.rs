//! Checkout, transaction status, and cancellation handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use warung_core::{ItemSnapshot, PaymentMethod, RefId, Transaction, TxStatus, UserId};

use crate::auth::ServiceAuth;
use crate::engine::{CheckoutMethod, CheckoutOutcome, PurchaseDescriptor};
use crate::error::ApiError;
use crate::state::AppState;

/// A transaction rendered for API consumers.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Reference id.
    pub ref_id: String,
    /// Owning buyer.
    pub user_id: i64,
    /// Settlement status.
    pub status: TxStatus,
    /// Payment method.
    pub method: PaymentMethod,
    /// Snapshot of what was purchased.
    pub item: ItemSnapshot,
    /// Total amount.
    pub amount: i64,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            ref_id: tx.ref_id.to_string(),
            user_id: tx.user_id.as_i64(),
            status: tx.status,
            method: tx.method,
            item: tx.item.clone(),
            amount: tx.amount,
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// Checkout request from the chat dispatcher.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// The buyer's platform id.
    pub user_id: i64,
    /// The buyer's current display name.
    pub display_name: String,
    /// What is being purchased.
    #[serde(flatten)]
    pub descriptor: PurchaseDescriptor,
    /// How the buyer pays.
    pub method: CheckoutMethod,
}

/// Checkout response.
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CheckoutResponse {
    /// The purchase settled synchronously.
    Settled {
        /// The SUCCESS ledger row.
        transaction: TransactionResponse,
        /// Balance after the debit.
        new_balance: i64,
        /// What was delivered.
        delivery: crate::engine::Delivery,
    },
    /// A gateway offer is open; settlement arrives by webhook.
    Pending {
        /// The PENDING ledger row.
        transaction: TransactionResponse,
        /// URL of the QR image the buyer scans.
        qr_url: String,
        /// Hosted checkout page link.
        checkout_url: String,
        /// When the offer expires (RFC 3339).
        expires_at: String,
    },
}

/// Create a purchase or top-up intent.
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let outcome = state
        .engine
        .checkout(
            UserId::new(body.user_id),
            &body.display_name,
            &body.descriptor,
            body.method,
        )
        .await?;

    let response = match outcome {
        CheckoutOutcome::BalanceSettled {
            transaction,
            new_balance,
            delivery,
        } => CheckoutResponse::Settled {
            transaction: TransactionResponse::from(&transaction),
            new_balance,
            delivery,
        },
        CheckoutOutcome::GatewayOffer {
            transaction,
            qr_url,
            checkout_url,
            expires_at,
        } => CheckoutResponse::Pending {
            transaction: TransactionResponse::from(&transaction),
            qr_url,
            checkout_url,
            expires_at: expires_at.to_rfc3339(),
        },
    };

    Ok(Json(response))
}

/// Look up a transaction by reference id.
pub async fn transaction_status(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(ref_id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let (ref_id, _) = RefId::parse(&ref_id)
        .map_err(|_| ApiError::BadRequest("malformed reference id".into()))?;
    let tx = state.engine.transaction_status(&ref_id)?;
    Ok(Json(TransactionResponse::from(&tx)))
}

/// Cancellation request; names the owner so a buyer can only cancel their
/// own intents.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// The buyer claiming the cancellation.
    pub user_id: i64,
}

/// Cancellation response.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Whether the intent was removed.
    pub cancelled: bool,
    /// The removed row.
    pub transaction: TransactionResponse,
}

/// Cancel a still-pending gateway intent.
pub async fn cancel_transaction(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(ref_id): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<CancelResponse>, ApiError> {
    let (ref_id, _) = RefId::parse(&ref_id)
        .map_err(|_| ApiError::BadRequest("malformed reference id".into()))?;
    let removed = state.engine.cancel(&ref_id, UserId::new(body.user_id))?;
    Ok(Json(CancelResponse {
        cancelled: true,
        transaction: TransactionResponse::from(&removed),
    }))
}

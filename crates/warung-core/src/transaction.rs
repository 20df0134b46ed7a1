//! The transaction ledger row, the unit of settlement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Product, RefId, UserId};

/// Settlement status of a transaction.
///
/// Transitions are monotonic: `Pending` may move to any terminal state, and
/// terminal states are final. There is no transition out of `Success`,
/// `Failed`, or `Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    /// Awaiting gateway settlement.
    Pending,
    /// Settled; the business effect has been applied.
    Success,
    /// The gateway reported a failed payment.
    Failed,
    /// The gateway reported the payment window elapsed.
    Expired,
}

impl TxStatus {
    /// Whether this status is terminal (no further transitions).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// How the buyer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Synchronous debit against the internal balance ledger.
    Balance,
    /// Asynchronous settlement via the external QRIS gateway.
    Gateway,
}

/// What was purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    /// A catalog product; settlement dispenses one content item.
    Product,
    /// A balance top-up; settlement credits the buyer.
    Topup,
}

/// Denormalized snapshot of the purchased item.
///
/// Snapshotted at intent-creation time so later product edits or deletion
/// never alter settled history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// Whether this was a product purchase or a top-up.
    pub kind: ItemKind,
    /// Product category at purchase time.
    pub category: String,
    /// Product name at purchase time (used to resolve dispensing on the
    /// webhook path).
    pub product_name: String,
    /// Units purchased. Always 1 in the current design.
    pub quantity: u32,
    /// Unit price at purchase time.
    pub unit_price: i64,
}

impl ItemSnapshot {
    /// Snapshot a product purchase.
    #[must_use]
    pub fn of_product(product: &Product) -> Self {
        Self {
            kind: ItemKind::Product,
            category: product.category.clone(),
            product_name: product.name.clone(),
            quantity: 1,
            unit_price: product.price,
        }
    }

    /// Snapshot a balance top-up of the given amount.
    #[must_use]
    pub fn of_topup(amount: i64) -> Self {
        Self {
            kind: ItemKind::Topup,
            category: "TOPUP".to_string(),
            product_name: "TOPUP".to_string(),
            quantity: 1,
            unit_price: amount,
        }
    }
}

/// A transaction ledger row.
///
/// The reference id is unique and immutable once created. Rows are mutated
/// only by the settlement and cancellation paths, and deleted only when a
/// just-opened gateway intent's creation request failed (compensating
/// rollback) or the buyer cancels a still-pending intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// The owning buyer.
    pub user_id: UserId,

    /// Globally unique reference id (`{TYPE}-{userId}-{epochMillis}`).
    pub ref_id: RefId,

    /// Current settlement status.
    pub status: TxStatus,

    /// How the buyer paid.
    pub method: PaymentMethod,

    /// Snapshot of what was purchased.
    pub item: ItemSnapshot,

    /// Total amount in integer currency units.
    pub amount: i64,

    /// Authenticity signature received from the gateway callback, if any.
    pub gateway_signature: Option<String>,

    /// When the intent was opened.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Open a PENDING gateway intent.
    #[must_use]
    pub fn pending_gateway(user_id: UserId, ref_id: RefId, item: ItemSnapshot, amount: i64) -> Self {
        Self {
            user_id,
            ref_id,
            status: TxStatus::Pending,
            method: PaymentMethod::Gateway,
            item,
            amount,
            gateway_signature: None,
            created_at: Utc::now(),
        }
    }

    /// Record a balance settlement.
    ///
    /// Balance payments have no PENDING state: the row is born SUCCESS as
    /// part of the same logical operation that debits the balance.
    #[must_use]
    pub fn settled_balance(user_id: UserId, ref_id: RefId, item: ItemSnapshot, amount: i64) -> Self {
        Self {
            user_id,
            ref_id,
            status: TxStatus::Success,
            method: PaymentMethod::Balance,
            item,
            amount,
            gateway_signature: None,
            created_at: Utc::now(),
        }
    }
}

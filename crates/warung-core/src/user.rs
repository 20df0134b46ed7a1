//! The buyer account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A buyer account on the storefront.
///
/// Created lazily on first interaction and never deleted. The balance is in
/// integer currency units and is kept non-negative by the settlement paths:
/// every debit re-checks a fresh read before applying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable numeric platform identifier (unique).
    pub user_id: UserId,

    /// Display name, refreshed on every interaction.
    pub display_name: String,

    /// Current balance in integer currency units. Never negative.
    pub balance: i64,

    /// Lifetime number of settled transactions.
    pub total_transactions: u64,

    /// When the user first interacted with the store.
    pub joined_at: DateTime<Utc>,
}

impl User {
    /// Create a fresh account with zero balance.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            balance: 0,
            total_transactions: 0,
            joined_at: Utc::now(),
        }
    }
}

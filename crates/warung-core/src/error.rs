//! The settlement error taxonomy.

use crate::RefId;

/// Errors surfaced by the transaction and fulfillment engine.
///
/// Validation and funds/stock errors are surfaced synchronously to the
/// caller with no retry. The webhook path only raises `Store` faults here;
/// inauthentic, replayed, or unrecognized callbacks are dispositions, and
/// the handler acknowledges the gateway regardless.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Bad input (non-positive amount, unsupported method, missing fields).
    /// Rejected before any mutation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Product or transaction absent.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("product", "transaction", "user").
        entity: &'static str,
        /// The id that missed.
        id: String,
    },

    /// The content queue was empty at the time of the dispense attempt.
    #[error("out of stock: {product}")]
    OutOfStock {
        /// Product name.
        product: String,
    },

    /// Buyer balance below the required amount. No mutation was applied.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Callback replay on an already-terminal transaction.
    #[error("duplicate settlement for {0}")]
    Duplicate(RefId),

    /// The upstream payment-creation call failed or was declined.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// The transaction is not PENDING and cannot be cancelled.
    #[error("transaction {0} is not cancelable")]
    NotCancelable(RefId),

    /// Ledger store fault.
    #[error("store error: {0}")]
    Store(String),
}

//! Error types for the ledger store.

use warung_core::TxStatus;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("user", "product", "transaction", "setting").
        entity: &'static str,
        /// The id that missed.
        id: String,
    },

    /// Balance below the required amount; no mutation was applied.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// A transaction with this reference id already exists.
    #[error("duplicate reference id: {ref_id}")]
    DuplicateRef {
        /// The colliding reference id.
        ref_id: String,
    },

    /// Status transition refused: the transaction is already terminal.
    #[error("transaction {ref_id} already settled as {status:?}")]
    AlreadySettled {
        /// The reference id.
        ref_id: String,
        /// The terminal status it holds.
        status: TxStatus,
    },

    /// The content queue was empty at the time of the dispense attempt.
    #[error("out of stock: {product}")]
    OutOfStock {
        /// Product name.
        product: String,
    },

    /// Cancellation refused: the transaction is not PENDING or not owned by
    /// the caller.
    #[error("transaction {ref_id} is not cancelable")]
    NotCancelable {
        /// The reference id.
        ref_id: String,
    },

    /// A product with this name already exists (unique index).
    #[error("product name already taken: {name}")]
    NameTaken {
        /// The colliding name.
        name: String,
    },
}

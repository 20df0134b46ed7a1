//! `RocksDB` ledger store for the warung storefront.
//!
//! This crate persists users, products, transactions, and settings using
//! `RocksDB` with column families. Every state transition that must be
//! exactly-once (balance debit, stock pop, transaction status transition) is
//! a single compound operation here: a fresh read and a `WriteBatch` commit
//! performed under the store's internal write lock, so no caller ever does a
//! read-then-separate-write on shared state in application memory.
//!
//! # Column families
//!
//! - `users`: buyer accounts, keyed by big-endian `user_id`
//! - `products`: catalog entries, keyed by product ULID
//! - `products_by_name`: unique name index (name -> product id)
//! - `transactions`: ledger rows, keyed by reference id
//! - `transactions_by_user`: chronological per-user index
//! - `settings`: flat key/value toggles

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use warung_core::{Product, ProductId, ProductPatch, RefId, Setting, Transaction, TxStatus, User, UserId};

/// One content item removed from a product's FIFO queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispensed {
    /// The delivered content string.
    pub content: String,
    /// Stock remaining after the pop.
    pub remaining_stock: u32,
    /// Lifetime units sold after the pop.
    pub total_sold: u64,
}

/// Aggregate entity counts for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LedgerCounts {
    /// Number of buyer accounts.
    pub users: u64,
    /// Number of catalog products.
    pub products: u64,
    /// Total ledger rows.
    pub transactions: u64,
    /// Rows in SUCCESS.
    pub success: u64,
    /// Rows in PENDING.
    pub pending: u64,
    /// Rows in FAILED or EXPIRED.
    pub failed: u64,
}

/// The storage trait defining all ledger operations.
///
/// Abstracts the storage layer so the engine can be exercised against any
/// implementation with the same atomicity guarantees.
pub trait Store: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Get or lazily create a buyer account, refreshing the display name if
    /// it changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn ensure_user(&self, user_id: UserId, display_name: &str) -> Result<User>;

    /// Get a buyer account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// Apply a signed balance delta (admin adjustment).
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientFunds` if the delta would drive the
    ///   balance negative; nothing is applied.
    fn adjust_balance(&self, user_id: UserId, delta: i64) -> Result<i64>;

    /// Credit a settled top-up: balance += amount, lifetime transaction
    /// count += 1, atomically.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn credit_topup(&self, user_id: UserId, amount: i64) -> Result<i64>;

    /// List every known user id (broadcast fan-out source).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_user_ids(&self) -> Result<Vec<UserId>>;

    // =========================================================================
    // Product Operations
    // =========================================================================

    /// Insert a new product, enforcing name uniqueness.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NameTaken` if a product with the same name
    /// already exists.
    fn create_product(&self, product: &Product) -> Result<()>;

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// Get a product by its unique name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_product_by_name(&self, name: &str) -> Result<Option<Product>>;

    /// List all products, ordered by category then price.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_products(&self) -> Result<Vec<Product>>;

    /// Apply a typed patch to the closed set of editable fields.
    ///
    /// Returns the updated product.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the product doesn't exist.
    /// - `StoreError::NameTaken` if renaming onto an existing name.
    fn update_product(&self, id: &ProductId, patch: &ProductPatch) -> Result<Product>;

    /// Delete a product and its name-index entry.
    ///
    /// Settled transactions keep their denormalized snapshot; history is
    /// immutable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    fn delete_product(&self, id: &ProductId) -> Result<()>;

    /// Append content items to the FIFO queue, updating the stock counter in
    /// the same write.
    ///
    /// Returns the stock after the append.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    fn append_stock(&self, id: &ProductId, items: &[String]) -> Result<u32>;

    /// Atomically pop the queue head, decrement stock, and increment
    /// lifetime-sold. Two concurrent dispenses never return the same item.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the product doesn't exist.
    /// - `StoreError::OutOfStock` if the queue was already empty.
    fn dispense(&self, id: &ProductId) -> Result<Dispensed>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Insert a PENDING gateway intent, enforcing reference-id uniqueness.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateRef` on a reference-id collision.
    fn insert_pending(&self, tx: &Transaction) -> Result<()>;

    /// Get a transaction by reference id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, ref_id: &RefId) -> Result<Option<Transaction>>;

    /// Delete a transaction outright (compensating action for a gateway
    /// intent whose creation call failed).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the row doesn't exist.
    fn delete_transaction(&self, ref_id: &RefId) -> Result<()>;

    /// Delete a PENDING transaction matching both reference id and owner
    /// (buyer-initiated cancellation). Returns the removed row.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no such row exists.
    /// - `StoreError::NotCancelable` if the row is not PENDING or belongs to
    ///   a different buyer.
    fn cancel_pending(&self, ref_id: &RefId, user_id: UserId) -> Result<Transaction>;

    /// List transactions for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_by_user(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>>;

    /// Conditionally transition PENDING -> SUCCESS, recording the received
    /// gateway signature. This write is the idempotency boundary for the
    /// webhook path: a second caller observes the terminal state and stops.
    ///
    /// Returns the updated row.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the row doesn't exist.
    /// - `StoreError::AlreadySettled` if the row is already terminal.
    fn mark_success(&self, ref_id: &RefId, signature: Option<&str>) -> Result<Transaction>;

    /// Conditionally transition PENDING -> FAILED or EXPIRED.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the row doesn't exist.
    /// - `StoreError::AlreadySettled` if the row is already terminal.
    fn mark_terminal(&self, ref_id: &RefId, status: TxStatus) -> Result<Transaction>;

    // =========================================================================
    // Compound Settlement
    // =========================================================================

    /// Settle a balance purchase in one atomic write: verify funds against
    /// a fresh read, debit the balance, bump the lifetime transaction count,
    /// and append the SUCCESS ledger row.
    ///
    /// The transaction must already carry status SUCCESS and method BALANCE.
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientFunds` if the balance is too low; nothing
    ///   is applied.
    /// - `StoreError::DuplicateRef` on a reference-id collision.
    fn settle_balance_purchase(&self, tx: &Transaction) -> Result<i64>;

    // =========================================================================
    // Settings
    // =========================================================================

    /// Get a setting by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_setting(&self, key: &str) -> Result<Option<Setting>>;

    /// Insert or update a setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_setting(&self, setting: &Setting) -> Result<()>;

    // =========================================================================
    // Stats
    // =========================================================================

    /// Aggregate entity counts for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn counts(&self) -> Result<LedgerCounts>;
}

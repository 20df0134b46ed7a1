//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Buyer accounts, keyed by big-endian `user_id`.
    pub const USERS: &str = "users";

    /// Catalog products, keyed by `product_id` (ULID bytes).
    pub const PRODUCTS: &str = "products";

    /// Unique index: product name -> `product_id` bytes.
    pub const PRODUCTS_BY_NAME: &str = "products_by_name";

    /// Transaction ledger, keyed by reference id (unique).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by
    /// `user_id (8) || created_millis (8) || ref_id`. Value is empty.
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Operational settings, keyed by setting key.
    pub const SETTINGS: &str = "settings";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::PRODUCTS,
        cf::PRODUCTS_BY_NAME,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::SETTINGS,
    ]
}

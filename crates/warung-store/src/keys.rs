//! Key encoding utilities for `RocksDB`.

use chrono::{DateTime, Utc};
use warung_core::{ProductId, RefId, UserId};

/// Create a user key from a user id (8-byte big-endian, sort-friendly).
#[must_use]
pub fn user_key(user_id: UserId) -> [u8; 8] {
    user_id.to_be_bytes()
}

/// Create a product key from a product id (16-byte ULID).
#[must_use]
pub fn product_key(product_id: &ProductId) -> [u8; 16] {
    product_id.to_bytes()
}

/// Create a product-name index key.
#[must_use]
pub fn product_name_key(name: &str) -> Vec<u8> {
    name.as_bytes().to_vec()
}

/// Create a transaction key from a reference id.
#[must_use]
pub fn transaction_key(ref_id: &RefId) -> Vec<u8> {
    ref_id.as_str().as_bytes().to_vec()
}

/// Create a user-transaction index key.
///
/// Format: `user_id (8 bytes) || created_millis (8 bytes) || ref_id`, so a
/// forward scan over the user prefix yields chronological order.
#[must_use]
pub fn user_transaction_key(user_id: UserId, created_at: DateTime<Utc>, ref_id: &RefId) -> Vec<u8> {
    let ref_bytes = ref_id.as_str().as_bytes();
    let mut key = Vec::with_capacity(16 + ref_bytes.len());
    key.extend_from_slice(&user_id.to_be_bytes());
    key.extend_from_slice(&created_at.timestamp_millis().to_be_bytes());
    key.extend_from_slice(ref_bytes);
    key
}

/// Create a prefix for iterating all transactions for a user.
#[must_use]
pub fn user_transactions_prefix(user_id: UserId) -> [u8; 8] {
    user_id.to_be_bytes()
}

/// Extract the reference id from a user-transaction index key.
///
/// Returns `None` if the key is shorter than the fixed prefix or the ref id
/// is not valid UTF-8.
#[must_use]
pub fn ref_id_from_user_key(key: &[u8]) -> Option<&str> {
    key.get(16..).and_then(|b| std::str::from_utf8(b).ok())
}

/// Create a setting key.
#[must_use]
pub fn setting_key(key: &str) -> Vec<u8> {
    key.as_bytes().to_vec()
}

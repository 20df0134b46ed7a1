//! Flat key/value operational settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An operational toggle (e.g. which sticker to send on success).
///
/// Settings are orthogonal to the core invariants and read-only from the
/// engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// Unique key.
    pub key: String,
    /// String value.
    pub value: String,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    /// Create a setting with the current timestamp.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            updated_at: Utc::now(),
        }
    }
}

/// The setting key holding the sticker sent after a successful purchase.
pub const SUCCESS_STICKER_KEY: &str = "success_sticker_id";

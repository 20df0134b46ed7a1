//! The sellable catalog entry and its content queue.

use serde::{Deserialize, Serialize};

use crate::ProductId;

/// A sellable catalog entry.
///
/// Each unit of purchasable content is an opaque string (a key, an account,
/// a voucher code) held in a FIFO queue. The invariant
/// `stock == contents.len()` holds at all times: every mutation of the queue
/// updates the counter in the same atomic store operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product id (ULID, time-ordered).
    pub id: ProductId,

    /// Free-text category grouping.
    pub category: String,

    /// Product name (unique across the catalog).
    pub name: String,

    /// Unit price in integer currency units.
    pub price: i64,

    /// Buyer-facing description.
    pub description: String,

    /// FIFO queue of deliverable content. Head is delivered first.
    pub contents: Vec<String>,

    /// Derived stock counter, always equal to `contents.len()`.
    pub stock: u32,

    /// Lifetime units sold.
    pub total_sold: u64,
}

impl Product {
    /// Create a new product with an empty content queue.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        price: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ProductId::generate(),
            category: category.into(),
            name: name.into(),
            price,
            description: description.into(),
            contents: Vec::new(),
            stock: 0,
            total_sold: 0,
        }
    }

    /// Whether the stock counter matches the content queue.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.stock as usize == self.contents.len()
    }
}

/// The closed set of editable product fields.
///
/// Admin edits mutate only these fields, each with typed validation in the
/// service layer; the content queue and counters are managed exclusively by
/// restock and dispense operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPatch {
    /// New category, if changing.
    pub category: Option<String>,
    /// New unique name, if changing.
    pub name: Option<String>,
    /// New unit price, if changing. Must be positive.
    pub price: Option<i64>,
    /// New description, if changing.
    pub description: Option<String>,
}

//! Product catalog handlers.
//!
//! Content strings are the goods being sold, so list and detail responses
//! never include the queue itself, only the derived stock counter.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use warung_core::{Product, ProductId, ProductPatch};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// A product rendered for API consumers.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    /// Product id.
    pub id: String,
    /// Category grouping.
    pub category: String,
    /// Unique name.
    pub name: String,
    /// Unit price.
    pub price: i64,
    /// Buyer-facing description.
    pub description: String,
    /// Units currently in the queue.
    pub stock: u32,
    /// Lifetime units sold.
    pub total_sold: u64,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            category: product.category.clone(),
            name: product.name.clone(),
            price: product.price,
            description: product.description.clone(),
            stock: product.stock,
            total_sold: product.total_sold,
        }
    }
}

/// List all products.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.store.list_products()?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

/// Create product request. The queue starts empty; stock arrives through
/// the restock endpoint.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Category grouping.
    pub category: String,
    /// Unique name.
    pub name: String,
    /// Unit price, must be positive.
    pub price: i64,
    /// Buyer-facing description.
    pub description: String,
}

/// Create a new product.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CreateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("product name must not be empty".into()));
    }
    if body.price <= 0 {
        return Err(ApiError::BadRequest("price must be positive".into()));
    }

    let product = Product::new(body.category, body.name.trim(), body.price, body.description);
    state.store.create_product(&product)?;

    tracing::info!(product_id = %product.id, name = %product.name, "Product created");

    Ok(Json(ProductResponse::from(&product)))
}

/// Get a product by id.
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state
        .store
        .get_product(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("product not found: {id}")))?;
    Ok(Json(ProductResponse::from(&product)))
}

/// Apply a partial edit to the closed set of editable fields.
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = parse_product_id(&id)?;

    if let Some(price) = patch.price {
        if price <= 0 {
            return Err(ApiError::BadRequest("price must be positive".into()));
        }
    }
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("product name must not be empty".into()));
        }
    }

    let updated = state.store.update_product(&id, &patch)?;
    Ok(Json(ProductResponse::from(&updated)))
}

/// Deletion response.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Whether the product was removed.
    pub deleted: bool,
}

/// Delete a product. Settled transactions keep their snapshots.
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_product_id(&id)?;
    state.store.delete_product(&id)?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(DeleteResponse { deleted: true }))
}

/// Restock request: content items to append, one deliverable per string.
#[derive(Debug, Deserialize)]
pub struct AppendStockRequest {
    /// Items to append to the queue tail.
    pub items: Vec<String>,
}

/// Restock response.
#[derive(Debug, Serialize)]
pub struct AppendStockResponse {
    /// Stock after the append.
    pub stock: u32,
}

/// Append content items to a product's queue.
pub async fn append_stock(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(id): Path<String>,
    Json(body): Json<AppendStockRequest>,
) -> Result<Json<AppendStockResponse>, ApiError> {
    let id = parse_product_id(&id)?;

    let items: Vec<String> = body
        .items
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        return Err(ApiError::BadRequest("no content items provided".into()));
    }

    let stock = state.store.append_stock(&id, &items)?;
    tracing::info!(product_id = %id, added = items.len(), stock, "Stock appended");
    Ok(Json(AppendStockResponse { stock }))
}

fn parse_product_id(raw: &str) -> Result<ProductId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("malformed product id".into()))
}

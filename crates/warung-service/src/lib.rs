//! Warung storefront HTTP service.
//!
//! This crate hosts the Transaction & Fulfillment Engine and its HTTP
//! surface:
//!
//! - Checkout: purchase and top-up intents, status checks, cancellation
//! - Webhook: asynchronous QRIS gateway settlement (always acknowledged)
//! - Admin: product catalog CRUD, stock restock, balance adjustments,
//!   settings, aggregate stats
//!
//! # Authentication
//!
//! The chat dispatcher and the admin dashboard authenticate with a shared
//! service API key (`x-api-key`). The gateway webhook is unauthenticated at
//! the HTTP layer; authenticity is established per-callback by signature or
//! origin checks inside the engine.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Some handlers need async for routing consistency

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use engine::{
    CallbackDisposition, CallbackEvent, CheckoutMethod, CheckoutOutcome, Delivery, Engine,
    PurchaseDescriptor, WebhookPolicy,
};
pub use error::ApiError;
pub use notify::{Notifier, NoopNotifier, TelegramNotifier};
pub use routes::create_router;
pub use state::AppState;

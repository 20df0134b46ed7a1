//! HTTP request handlers.

pub mod checkout;
pub mod health;
pub mod products;
pub mod settings;
pub mod stats;
pub mod users;
pub mod webhooks;

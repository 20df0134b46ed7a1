//! Core domain types for the warung digital-goods storefront.
//!
//! This crate defines the entities shared by the store, gateway, and service
//! crates:
//!
//! - Identifiers ([`UserId`], [`ProductId`], [`RefId`])
//! - The [`User`] balance account, [`Product`] catalog entry with its FIFO
//!   content queue, and the [`Transaction`] ledger row
//! - HMAC signature utilities shared by outbound gateway requests and
//!   inbound callback verification
//! - The [`EngineError`] taxonomy used across settlement paths
//!
//! No I/O happens here; everything is plain data plus pure functions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod product;
pub mod setting;
pub mod signature;
pub mod transaction;
pub mod user;

pub use error::EngineError;
pub use ids::{IdError, ProductId, RefId, RefKind, UserId};
pub use product::{Product, ProductPatch};
pub use setting::Setting;
pub use transaction::{ItemKind, ItemSnapshot, PaymentMethod, Transaction, TxStatus};
pub use user::User;

//! QRIS payment-gateway client.
//!
//! This crate builds the signed outbound payment-creation request and parses
//! the gateway's synchronous response into a [`CheckoutArtifact`] (QR image
//! URL plus checkout link) or a declared failure. The asynchronous side of
//! the protocol, the settlement callback, is handled by the service's
//! webhook path; this crate only covers the outbound leg.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod config;
mod error;

pub use client::{CheckoutArtifact, QrisClient};
pub use config::GatewayConfig;
pub use error::GatewayError;

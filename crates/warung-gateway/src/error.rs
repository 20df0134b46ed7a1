//! Error type for gateway operations.

/// Errors that can occur talking to the payment gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP transport failed (timeout, DNS, connection reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway returned a response that could not be parsed.
    #[error("malformed gateway response: {0}")]
    Malformed(String),

    /// The gateway declined the payment-creation request.
    #[error("payment declined: {0}")]
    Declined(String),
}

//! Gateway client configuration.

/// Configuration for the QRIS gateway client.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway API base URL (e.g. `https://violetmediapay.com`).
    pub base_url: String,

    /// Merchant API key. Also the HMAC key for inbound callback signatures.
    pub api_key: String,

    /// Merchant secret key. HMAC key for outbound request signatures.
    pub secret_key: String,

    /// Public URL the gateway calls back on settlement.
    pub callback_url: String,

    /// Public URL the buyer is redirected to after checkout.
    pub redirect_url: String,
}

//! Environment-driven service configuration.

use std::collections::HashSet;

/// Runtime knobs, all read once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket the HTTP server binds (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/warung").
    pub data_dir: String,

    /// Service API key for dispatcher/admin requests.
    pub service_api_key: Option<String>,

    /// Public base URL of this service, used to build the gateway callback
    /// and redirect URLs.
    pub server_base_url: String,

    /// Payment gateway base URL (optional; gateway checkout disabled
    /// without it).
    pub gateway_base_url: Option<String>,

    /// Merchant API key. Also the HMAC key for verifying callback
    /// signatures.
    pub gateway_api_key: Option<String>,

    /// Merchant secret key for signing outbound creation requests.
    pub gateway_secret_key: Option<String>,

    /// Gateway egress addresses allowed to deliver unsigned callbacks.
    pub gateway_allowed_ips: HashSet<String>,

    /// Telegram bot token for the notification sink (optional).
    pub bot_token: Option<String>,

    /// Broadcast channel chat id for sale notifications (optional).
    pub channel_id: Option<String>,

    /// Admin chat id alerted on paid-but-out-of-stock settlements
    /// (optional).
    pub admin_chat_id: Option<i64>,

    /// Origins permitted by the CORS layer; `*` opens it.
    pub cors_origins: Vec<String>,

    /// Request body cap in bytes.
    pub max_body_bytes: usize,

    /// Per-request deadline in seconds.
    pub request_timeout_seconds: u64,
}

/// Known gateway egress addresses, used when `GATEWAY_ALLOWED_IPS` is unset.
const DEFAULT_GATEWAY_IPS: &[&str] = &["202.155.132.37", "2001:df7:5300:9::122"];

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let gateway_allowed_ips = std::env::var("GATEWAY_ALLOWED_IPS")
            .map(|s| {
                s.split(',')
                    .map(|ip| ip.trim().to_string())
                    .filter(|ip| !ip.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                DEFAULT_GATEWAY_IPS
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            });

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/warung".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            server_base_url: std::env::var("SERVER_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            gateway_base_url: std::env::var("GATEWAY_BASE_URL").ok(),
            gateway_api_key: std::env::var("GATEWAY_API_KEY").ok(),
            gateway_secret_key: std::env::var("GATEWAY_SECRET_KEY").ok(),
            gateway_allowed_ips,
            bot_token: std::env::var("BOT_TOKEN").ok(),
            channel_id: std::env::var("CHANNEL_ID").ok(),
            admin_chat_id: std::env::var("ADMIN_CHAT_ID")
                .ok()
                .and_then(|s| s.parse().ok()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }

    /// The callback URL handed to the gateway on payment creation.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}/webhooks/qris", self.server_base_url)
    }

    /// The redirect URL handed to the gateway on payment creation.
    #[must_use]
    pub fn redirect_url(&self) -> String {
        format!("{}/success", self.server_base_url)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/warung".into(),
            service_api_key: None,
            server_base_url: "http://localhost:8080".into(),
            gateway_base_url: None,
            gateway_api_key: None,
            gateway_secret_key: None,
            gateway_allowed_ips: DEFAULT_GATEWAY_IPS
                .iter()
                .map(ToString::to_string)
                .collect(),
            bot_token: None,
            channel_id: None,
            admin_chat_id: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

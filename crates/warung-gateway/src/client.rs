//! QRIS gateway API client implementation.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use warung_core::signature::payment_signature;
use warung_core::RefId;

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// The payment-creation endpoint, relative to the configured base URL.
const CREATE_PATH: &str = "/api/live/create";

/// Payment validity window embedded in every creation request, in seconds.
const VALIDITY_SECS: i64 = 300;

/// A successfully created checkout offer.
#[derive(Debug, Clone)]
pub struct CheckoutArtifact {
    /// URL of the QR image the buyer scans.
    pub qr_url: String,
    /// Hosted checkout page link.
    pub checkout_url: String,
    /// When the offer expires.
    pub expires_at: DateTime<Utc>,
}

/// Raw gateway response envelope.
#[derive(Debug, Deserialize)]
struct CreateResponse {
    status: bool,
    #[serde(default)]
    data: Option<CreateData>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateData {
    /// QR image URL.
    target: Option<String>,
    checkout_url: Option<String>,
}

/// QRIS gateway client.
#[derive(Debug, Clone)]
pub struct QrisClient {
    client: Client,
    config: GatewayConfig,
}

impl QrisClient {
    /// Create a new gateway client with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }

    /// Create a QRIS payment offer for the given reference id and amount.
    ///
    /// The request is signed with HMAC-SHA256 over
    /// `refId || apiKey || amount` keyed by the merchant secret, and carries
    /// a five-minute expiry epoch plus the callback and redirect URLs.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Http`] on transport failure.
    /// - [`GatewayError::Declined`] when the gateway refuses the request.
    /// - [`GatewayError::Malformed`] when the response cannot be parsed or
    ///   a success envelope is missing its checkout data.
    pub async fn create_payment(
        &self,
        ref_id: &RefId,
        amount: i64,
        customer_name: &str,
        description: &str,
    ) -> Result<CheckoutArtifact, GatewayError> {
        let nominal = amount.to_string();
        let signature = payment_signature(
            &self.config.secret_key,
            &self.config.api_key,
            ref_id.as_str(),
            amount,
        );
        let expires_at = Utc::now() + chrono::Duration::seconds(VALIDITY_SECS);

        let mut params = HashMap::new();
        params.insert("api_key", self.config.api_key.clone());
        params.insert("channel_payment", "QRIS".to_string());
        params.insert("ref_kode", ref_id.to_string());
        params.insert("nominal", nominal);
        params.insert("cus_nama", customer_name.to_string());
        params.insert("cus_email", format!("buyer_{ref_id}@warung.store"));
        params.insert("cus_phone", "081234567890".to_string());
        params.insert("produk", description.to_string());
        params.insert("url_redirect", self.config.redirect_url.clone());
        params.insert("url_callback", self.config.callback_url.clone());
        params.insert("expired_time", expires_at.timestamp().to_string());
        params.insert("signature", signature);

        let response = self
            .client
            .post(format!("{}{CREATE_PATH}", self.config.base_url))
            .form(&params)
            .send()
            .await?;

        // The gateway signals decline through the body, not the HTTP status.
        let body = response.text().await?;
        let parsed: CreateResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::Malformed(e.to_string()))?;

        if !parsed.status {
            let msg = parsed.msg.unwrap_or_else(|| "gateway declined".to_string());
            tracing::warn!(ref_id = %ref_id, reason = %msg, "Gateway declined payment creation");
            return Err(GatewayError::Declined(msg));
        }

        let data = parsed
            .data
            .ok_or_else(|| GatewayError::Malformed("success response without data".into()))?;
        let qr_url = data
            .target
            .ok_or_else(|| GatewayError::Malformed("success response without QR target".into()))?;
        let checkout_url = data.checkout_url.unwrap_or_else(|| qr_url.clone());

        tracing::info!(ref_id = %ref_id, amount, "Gateway checkout created");

        Ok(CheckoutArtifact {
            qr_url,
            checkout_url,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warung_core::{RefKind, UserId};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> QrisClient {
        QrisClient::new(GatewayConfig {
            base_url: base_url.to_string(),
            api_key: "api-key".into(),
            secret_key: "secret-key".into(),
            callback_url: "https://store.example/webhooks/qris".into(),
            redirect_url: "https://store.example/success".into(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn create_payment_success() {
        let server = MockServer::start().await;
        let ref_id = RefId::generate(RefKind::Product, UserId::new(7));

        Mock::given(method("POST"))
            .and(path("/api/live/create"))
            .and(body_string_contains("channel_payment=QRIS"))
            .and(body_string_contains("ref_kode="))
            .and(body_string_contains("signature="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "data": {
                    "target": "https://pay.example/qr/abc.png",
                    "checkout_url": "https://pay.example/checkout/abc"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let artifact = test_client(&server.uri())
            .create_payment(&ref_id, 50_000, "Alice", "Buy Netflix")
            .await
            .unwrap();

        assert_eq!(artifact.qr_url, "https://pay.example/qr/abc.png");
        assert_eq!(artifact.checkout_url, "https://pay.example/checkout/abc");
        assert!(artifact.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn create_payment_declined() {
        let server = MockServer::start().await;
        let ref_id = RefId::generate(RefKind::TopUp, UserId::new(8));

        Mock::given(method("POST"))
            .and(path("/api/live/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": false,
                "msg": "amount below minimum"
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .create_payment(&ref_id, 100, "Bob", "Top up")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Declined(msg) if msg == "amount below minimum"));
    }

    #[tokio::test]
    async fn create_payment_malformed_body() {
        let server = MockServer::start().await;
        let ref_id = RefId::generate(RefKind::TopUp, UserId::new(9));

        Mock::given(method("POST"))
            .and(path("/api/live/create"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .create_payment(&ref_id, 10_000, "Carol", "Top up")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[tokio::test]
    async fn success_without_target_is_malformed() {
        let server = MockServer::start().await;
        let ref_id = RefId::generate(RefKind::Product, UserId::new(10));

        Mock::given(method("POST"))
            .and(path("/api/live/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "data": {}
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .create_payment(&ref_id, 10_000, "Dan", "Buy VPN")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Malformed(_)));
    }
}

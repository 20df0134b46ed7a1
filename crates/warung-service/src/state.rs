//! Application state.

use std::sync::Arc;

use warung_gateway::{GatewayConfig, QrisClient};
use warung_store::Store;

use crate::config::ServiceConfig;
use crate::engine::{Engine, WebhookPolicy};
use crate::notify::{NoopNotifier, Notifier, TelegramNotifier};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The ledger store.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// The transaction and fulfillment engine.
    pub engine: Arc<Engine>,
}

impl AppState {
    /// Create the application state, wiring up whichever integrations the
    /// configuration enables.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        // Create the gateway client if fully configured
        let gateway = match (
            config.gateway_base_url.as_ref(),
            config.gateway_api_key.as_ref(),
            config.gateway_secret_key.as_ref(),
        ) {
            (Some(base_url), Some(api_key), Some(secret_key)) => {
                let gateway_config = GatewayConfig {
                    base_url: base_url.clone(),
                    api_key: api_key.clone(),
                    secret_key: secret_key.clone(),
                    callback_url: config.callback_url(),
                    redirect_url: config.redirect_url(),
                };
                match QrisClient::new(gateway_config) {
                    Ok(client) => {
                        tracing::info!(gateway_url = %base_url, "QRIS gateway enabled");
                        Some(Arc::new(client))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create gateway client");
                        None
                    }
                }
            }
            _ => None,
        };

        if gateway.is_none() {
            tracing::warn!("Gateway not configured - only balance payments will be available");
        }

        // Create the notifier if a bot token is configured
        let notifier: Arc<dyn Notifier> = match config.bot_token.as_ref() {
            Some(token) => match TelegramNotifier::new(token, config.channel_id.clone()) {
                Ok(notifier) => {
                    tracing::info!("Chat notifications enabled");
                    Arc::new(notifier)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create notifier");
                    Arc::new(NoopNotifier)
                }
            },
            None => {
                tracing::warn!("Bot token not configured - notifications will be dropped");
                Arc::new(NoopNotifier)
            }
        };

        let policy = WebhookPolicy {
            hmac_key: config.gateway_api_key.clone(),
            allowed_ips: config.gateway_allowed_ips.clone(),
        };

        let engine = Arc::new(Engine::new(
            store.clone(),
            gateway,
            notifier,
            policy,
            config.admin_chat_id,
        ));

        Self {
            store,
            config,
            engine,
        }
    }

    /// Check if the gateway is configured.
    #[must_use]
    pub fn has_gateway(&self) -> bool {
        self.engine.gateway().is_some()
    }
}

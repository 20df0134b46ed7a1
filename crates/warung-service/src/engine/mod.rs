//! The Transaction & Fulfillment Engine.
//!
//! This module orchestrates intent creation, balance settlement, webhook
//! settlement, stock dispensing, and cancellation against the ledger store.
//! It is invoked concurrently from two independent ingress paths (the chat
//! dispatcher's checkout calls and the gateway's webhook callbacks) and
//! relies on exactly one synchronization primitive: the store's atomic
//! compound operations. The engine itself caches nothing across requests;
//! every operation re-reads before mutating.

mod checkout;
mod webhook;

use std::collections::HashSet;
use std::sync::Arc;

use warung_core::{EngineError, UserId};
use warung_gateway::QrisClient;
use warung_store::{Store, StoreError};

use crate::notify::Notifier;

pub use checkout::{CheckoutMethod, CheckoutOutcome, Delivery, PurchaseDescriptor};
pub use webhook::{CallbackDisposition, CallbackEvent};

/// Authenticity policy for inbound gateway callbacks.
#[derive(Debug, Clone, Default)]
pub struct WebhookPolicy {
    /// HMAC key (the merchant api key) for callback signatures. Without it,
    /// every signed callback is rejected.
    pub hmac_key: Option<String>,

    /// Source addresses allowed to deliver unsigned callbacks. Legacy
    /// fallback: a weaker trust channel than the signature, kept for
    /// gateway compatibility.
    pub allowed_ips: HashSet<String>,
}

/// The engine, shared across all request handlers.
pub struct Engine {
    store: Arc<dyn Store>,
    gateway: Option<Arc<QrisClient>>,
    notifier: Arc<dyn Notifier>,
    policy: WebhookPolicy,
    admin_chat_id: Option<i64>,
}

impl Engine {
    /// Build an engine over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Option<Arc<QrisClient>>,
        notifier: Arc<dyn Notifier>,
        policy: WebhookPolicy,
        admin_chat_id: Option<i64>,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            policy,
            admin_chat_id,
        }
    }

    /// The ledger store this engine settles against.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Best-effort message to a buyer; failures are logged, never
    /// propagated.
    pub(crate) async fn notify_user(&self, user_id: UserId, text: &str) {
        if let Err(e) = self.notifier.send_user(user_id, text).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to notify user");
        }
    }

    /// Best-effort message to the broadcast channel.
    pub(crate) async fn notify_channel(&self, text: &str) {
        if let Err(e) = self.notifier.send_channel(text).await {
            tracing::warn!(error = %e, "Failed to notify channel");
        }
    }

    /// Best-effort success sticker, if one is configured.
    pub(crate) async fn send_success_sticker(&self, user_id: UserId) {
        let sticker = match self.store.get_setting(warung_core::setting::SUCCESS_STICKER_KEY) {
            Ok(Some(setting)) if !setting.value.is_empty() => setting.value,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read success sticker setting");
                return;
            }
        };
        if let Err(e) = self.notifier.send_sticker(user_id, &sticker).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to send sticker");
        }
    }

    /// Best-effort alert to the admin chat.
    pub(crate) async fn notify_admin(&self, text: &str) {
        if let Some(admin) = self.admin_chat_id {
            self.notify_user(UserId::new(admin), text).await;
        }
    }

    pub(crate) fn gateway(&self) -> Option<&Arc<QrisClient>> {
        self.gateway.as_ref()
    }

    pub(crate) fn policy(&self) -> &WebhookPolicy {
        &self.policy
    }
}

/// Store faults cross into the engine taxonomy here; business conditions
/// keep their identity.
pub(crate) fn map_store_err(err: StoreError) -> EngineError {
    match err {
        StoreError::NotFound { entity, id } => EngineError::NotFound { entity, id },
        StoreError::InsufficientFunds { balance, required } => {
            EngineError::InsufficientFunds { balance, required }
        }
        StoreError::OutOfStock { product } => EngineError::OutOfStock { product },
        other => EngineError::Store(other.to_string()),
    }
}

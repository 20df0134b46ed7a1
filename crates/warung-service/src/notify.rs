//! The notification sink.
//!
//! Outbound messages to a buyer or the broadcast channel are best-effort:
//! every call site fires them after the financial effect is durably
//! committed, logs failures, and never propagates them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use warung_core::UserId;

/// Errors from the notification channel. Callers log these, never return
/// them.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The messaging API rejected the request.
    #[error("messaging API error: {0}")]
    Api(String),
}

/// Fire-and-forget outbound messaging.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a text message to a buyer.
    async fn send_user(&self, user_id: UserId, text: &str) -> Result<(), NotifyError>;

    /// Send a text message to the broadcast channel.
    async fn send_channel(&self, text: &str) -> Result<(), NotifyError>;

    /// Send a sticker to a buyer.
    async fn send_sticker(&self, user_id: UserId, sticker_id: &str) -> Result<(), NotifyError>;
}

/// Telegram Bot API implementation of the notification sink.
pub struct TelegramNotifier {
    client: Client,
    token: String,
    channel_id: Option<String>,
}

impl TelegramNotifier {
    /// Create a notifier for the given bot token and optional broadcast
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>, channel_id: Option<String>) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            token: token.into(),
            channel_id,
        })
    }

    async fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/{method}", self.token);
        let response = self.client.post(url).form(params).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Api(format!("{status}: {body}")))
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_user(&self, user_id: UserId, text: &str) -> Result<(), NotifyError> {
        let chat_id = user_id.to_string();
        self.call(
            "sendMessage",
            &[("chat_id", chat_id.as_str()), ("text", text), ("parse_mode", "Markdown")],
        )
        .await
    }

    async fn send_channel(&self, text: &str) -> Result<(), NotifyError> {
        let Some(channel_id) = &self.channel_id else {
            return Ok(());
        };
        self.call(
            "sendMessage",
            &[("chat_id", channel_id.as_str()), ("text", text), ("parse_mode", "Markdown")],
        )
        .await
    }

    async fn send_sticker(&self, user_id: UserId, sticker_id: &str) -> Result<(), NotifyError> {
        let chat_id = user_id.to_string();
        self.call(
            "sendSticker",
            &[("chat_id", chat_id.as_str()), ("sticker", sticker_id)],
        )
        .await
    }
}

/// A notifier that drops everything, used in tests and when no bot token is
/// configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_user(&self, _user_id: UserId, _text: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn send_channel(&self, _text: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn send_sticker(&self, _user_id: UserId, _sticker_id: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

//! Telegram Bot API notifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use rollcall_core::config::TelegramConfig;
use rollcall_core::error::{ErrorCode, RollcallError, RollcallResult};
use rollcall_core::traits::{Dispatch, Notifier};

/// Sends Markdown messages with the Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    admin_chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    /// Create a notifier. Fails without a bot token.
    pub fn new(config: &TelegramConfig) -> RollcallResult<Self> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                RollcallError::Configuration(
                    "Telegram bot token required. Set TELEGRAM_BOT_TOKEN.".to_string(),
                )
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                RollcallError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                token
            ),
            admin_chat_id: config.admin_chat_id.clone().filter(|id| !id.trim().is_empty()),
        })
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> RollcallResult<Dispatch> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "Markdown",
        };

        // The endpoint embeds the bot token, so errors are stripped of the URL.
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let code = if e.is_timeout() {
                    ErrorCode::NetTimeout
                } else {
                    ErrorCode::NetConnectionFailed
                };
                RollcallError::Network {
                    message: format!("Telegram request failed: {}", e.without_url()),
                    code,
                    source: None,
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(api) if api.ok => {
                debug!(chat_id, "Telegram message sent");
                Ok(Dispatch::Delivered)
            }
            Ok(api) => Err(RollcallError::Notification {
                message: format!(
                    "Telegram rejected message ({}): {}",
                    api.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                    api.description.unwrap_or_default()
                ),
                code: ErrorCode::NotifyRejected,
            }),
            Err(_) => Err(RollcallError::notification(format!(
                "Unexpected Telegram response ({}): {}",
                status, body
            ))),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_to_recipient(&self, recipient: &str, message: &str) -> RollcallResult<Dispatch> {
        self.send_message(recipient, message).await
    }

    /// Without an admin chat the message is dropped, not sent.
    async fn send_to_admin(&self, message: &str) -> RollcallResult<Dispatch> {
        match &self.admin_chat_id {
            Some(chat_id) => self.send_message(chat_id, message).await,
            None => {
                debug!("No admin chat configured, dropping admin message");
                Ok(Dispatch::Dropped)
            }
        }
    }
}

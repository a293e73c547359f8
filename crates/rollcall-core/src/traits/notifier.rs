//! Notification transport trait.

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::error::RollcallResult;

/// What a transport did with a message it accepted without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to the delivery service.
    Delivered,
    /// Intentionally not sent, e.g. no destination is configured.
    Dropped,
}

/// Delivers formatted messages. Messages use Telegram-style Markdown.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a personal message to an identity's recipient handle.
    async fn send_to_recipient(&self, recipient: &str, message: &str) -> RollcallResult<Dispatch>;

    /// Send a message to the administrators' channel.
    async fn send_to_admin(&self, message: &str) -> RollcallResult<Dispatch>;
}

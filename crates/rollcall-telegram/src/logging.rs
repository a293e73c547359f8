//! Tracing-only notifier.

use async_trait::async_trait;
use tracing::info;

use rollcall_core::error::RollcallResult;
use rollcall_core::traits::{Dispatch, Notifier};

/// Writes every message to the log instead of delivering it. Every message is
/// reported as [`Dispatch::Dropped`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_to_recipient(&self, recipient: &str, message: &str) -> RollcallResult<Dispatch> {
        info!(recipient, message, "Notification (not delivered)");
        Ok(Dispatch::Dropped)
    }

    async fn send_to_admin(&self, message: &str) -> RollcallResult<Dispatch> {
        info!(message, "Admin notification (not delivered)");
        Ok(Dispatch::Dropped)
    }
}

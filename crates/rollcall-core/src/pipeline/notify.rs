//! Arrival notifications.
//!
//! Every arrival gets a personal message. Late arrivals also raise an admin
//! alert. Delivery is best-effort: failures are logged and reported in a
//! [`DeliveryReport`], never returned as errors.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, warn};

use crate::traits::{Dispatch, Notifier};
use crate::types::{Identity, Timeliness};

const TIME_FORMAT: &str = "%H:%M:%S";

/// What a notification is about.
#[derive(Debug, Clone, Copy)]
pub struct ArrivalNotice<'a> {
    pub identity: &'a Identity,
    pub arrived_at: DateTime<Local>,
    pub scanner_id: &'a str,
    pub timeliness: Timeliness,
}

/// Outcome of one message dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    Skipped,
    Failed(String),
}

/// Outcome of all messages for one arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub recipient: Delivery,
    /// Only present for late arrivals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<Delivery>,
}

impl DeliveryReport {
    pub fn all_sent(&self) -> bool {
        self.recipient == Delivery::Sent
            && self.admin.as_ref().map_or(true, |d| *d == Delivery::Sent)
    }
}

/// Personal message for the arriving identity.
pub fn recipient_message(notice: &ArrivalNotice<'_>) -> String {
    let emoji = if notice.timeliness.is_late() { "⚠️" } else { "✅" };

    format!(
        "{} *Good morning, {}!*\n\n\
         🕐 Arrival time: `{}`\n\
         📍 Location: `Scanner {}`\n\
         ⏰ Status: *{}*\n\n\
         Have a great day at work! 😊",
        emoji,
        escape_markdown(&notice.identity.name),
        notice.arrived_at.format(TIME_FORMAT),
        code_span(notice.scanner_id),
        notice.timeliness.describe(),
    )
}

/// Admin alert, only for late arrivals.
pub fn admin_message(notice: &ArrivalNotice<'_>) -> Option<String> {
    if !notice.timeliness.is_late() {
        return None;
    }

    Some(format!(
        "⚠️ *Late arrival*\n👤 Name: `{}`\n🕐 Time: `{}`\n⏰ {}",
        code_span(&notice.identity.name),
        notice.arrived_at.format(TIME_FORMAT),
        notice.timeliness.describe(),
    ))
}

/// Compose and send all messages for an arrival.
pub async fn dispatch(notifier: &dyn Notifier, notice: &ArrivalNotice<'_>) -> DeliveryReport {
    let recipient = if notice.identity.recipient.trim().is_empty() {
        debug!(identity_id = %notice.identity.id, "No recipient handle, skipping personal message");
        Delivery::Skipped
    } else {
        let message = recipient_message(notice);
        match notifier
            .send_to_recipient(&notice.identity.recipient, &message)
            .await
        {
            Ok(Dispatch::Delivered) => Delivery::Sent,
            Ok(Dispatch::Dropped) => Delivery::Skipped,
            Err(e) => {
                warn!(
                    identity_id = %notice.identity.id,
                    recipient = %notice.identity.recipient,
                    error = %e,
                    "Failed to send arrival notification"
                );
                Delivery::Failed(e.to_string())
            }
        }
    };

    let admin = match admin_message(notice) {
        Some(message) => Some(match notifier.send_to_admin(&message).await {
            Ok(Dispatch::Delivered) => Delivery::Sent,
            Ok(Dispatch::Dropped) => {
                debug!(identity_id = %notice.identity.id, "Late-arrival alert not sent, no admin channel");
                Delivery::Skipped
            }
            Err(e) => {
                warn!(identity_id = %notice.identity.id, error = %e, "Failed to send late-arrival alert");
                Delivery::Failed(e.to_string())
            }
        }),
        None => None,
    };

    DeliveryReport { recipient, admin }
}

/// Escape legacy Telegram Markdown control characters.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Code spans cannot contain backticks; drop them.
fn code_span(text: &str) -> String {
    text.replace('`', "")
}

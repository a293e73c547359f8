//! rollcall-telegram - notification transports for rollcall.
//!
//! [`TelegramNotifier`] delivers messages through the Telegram Bot API.
//! [`LogNotifier`] only logs them and is used when no bot token is configured.

mod logging;
mod telegram;

pub use logging::LogNotifier;
pub use telegram::TelegramNotifier;

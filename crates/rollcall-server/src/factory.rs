//! Factory for wiring the pipeline's collaborators from configuration.

use std::sync::Arc;

use rollcall_core::config::{RollcallConfig, StoreProvider, TelegramConfig};
use rollcall_core::error::RollcallResult;
use rollcall_core::pipeline::{Collaborators, DetectionPipeline};
use rollcall_core::store::SqliteStore;
use rollcall_core::traits::Notifier;
use rollcall_pocketbase::PocketBaseStore;
use rollcall_telegram::{LogNotifier, TelegramNotifier};
use tracing::{info, warn};

use crate::state::{AppState, ServiceInfo};

/// Build the application state from configuration.
pub fn create_state(config: &RollcallConfig) -> RollcallResult<AppState> {
    let (collaborators, info) = create_collaborators(config)?;
    let pipeline = DetectionPipeline::new(collaborators, &config.pipeline);
    Ok(AppState::new(pipeline, info))
}

/// Build the collaborator set named by the configuration.
pub fn create_collaborators(
    config: &RollcallConfig,
) -> RollcallResult<(Collaborators, ServiceInfo)> {
    let (notifier, notifier_name) = create_notifier(&config.telegram)?;

    let (collaborators, store_name) = match config.store.provider {
        StoreProvider::PocketBase => {
            info!(url = %config.pocketbase.url, "Using PocketBase store");
            let store = Arc::new(PocketBaseStore::new(&config.pocketbase)?);
            (Collaborators::from_store(store, notifier), "pocketbase")
        }
        StoreProvider::Sqlite => {
            info!(path = %config.store.sqlite_path.display(), "Using SQLite store");
            let store = Arc::new(SqliteStore::new(&config.store.sqlite_path)?);
            (Collaborators::from_store(store, notifier), "sqlite")
        }
    };

    Ok((
        collaborators,
        ServiceInfo {
            store: store_name,
            notifier: notifier_name,
        },
    ))
}

fn create_notifier(config: &TelegramConfig) -> RollcallResult<(Arc<dyn Notifier>, &'static str)> {
    if config.bot_token.as_deref().map_or(true, str::is_empty) {
        warn!("TELEGRAM_BOT_TOKEN not set, notifications will only be logged");
        return Ok((Arc::new(LogNotifier), "log"));
    }

    if config.admin_chat_id.is_none() {
        warn!("AUTHORIZED_CHAT_ID not set, late-arrival alerts are disabled");
    }

    Ok((Arc::new(TelegramNotifier::new(config)?), "telegram"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_with_log_notifier() {
        let dir = tempfile::tempdir().unwrap();
        let config = RollcallConfig::builder()
            .sqlite(dir.path().join("rollcall.db"))
            .build();

        let (_, info) = create_collaborators(&config).unwrap();
        assert_eq!(info.store, "sqlite");
        assert_eq!(info.notifier, "log");
    }

    #[test]
    fn test_pocketbase_with_telegram() {
        let config = RollcallConfig::builder()
            .pocketbase("http://127.0.0.1:8090", Some("token".to_string()))
            .telegram("123:abc", Some("-100".to_string()))
            .build();

        let (_, info) = create_collaborators(&config).unwrap();
        assert_eq!(info.store, "pocketbase");
        assert_eq!(info.notifier, "telegram");
    }

    #[test]
    fn test_invalid_pocketbase_url_fails() {
        let config = RollcallConfig::builder()
            .pocketbase("::not a url::", None)
            .build();
        assert!(create_collaborators(&config).is_err());
    }
}

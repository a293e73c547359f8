//! Configuration system for rollcall.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RollcallError, RollcallResult};

/// Default signal-strength threshold, roughly ten meters from a scanner.
pub const DEFAULT_RSSI_THRESHOLD: i32 = -70;

/// Default grace period after the expected start that still counts as on time.
pub const DEFAULT_GRACE_PERIOD_MINUTES: i64 = 5;

/// Longest accepted grace period: a full day.
pub const MAX_GRACE_PERIOD_MINUTES: i64 = 24 * 60;

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-request timeout in seconds. A sighting still processing after this
    /// long is acknowledged and finishes in the background.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 10,
        }
    }
}

/// Decision-pipeline tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sightings with a weaker signal than this are ignored as too far.
    pub rssi_threshold: i32,
    pub grace_period_minutes: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rssi_threshold: DEFAULT_RSSI_THRESHOLD,
            grace_period_minutes: DEFAULT_GRACE_PERIOD_MINUTES,
        }
    }
}

impl PipelineConfig {
    /// Grace period, clamped to `0..=MAX_GRACE_PERIOD_MINUTES`.
    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.grace_period_minutes.clamp(0, MAX_GRACE_PERIOD_MINUTES))
    }

    /// Reject a grace period outside `0..=MAX_GRACE_PERIOD_MINUTES`.
    pub fn validate(&self) -> RollcallResult<()> {
        if !(0..=MAX_GRACE_PERIOD_MINUTES).contains(&self.grace_period_minutes) {
            return Err(RollcallError::Configuration(format!(
                "grace period must be between 0 and {} minutes, got {}",
                MAX_GRACE_PERIOD_MINUTES, self.grace_period_minutes
            )));
        }
        Ok(())
    }
}

/// Store provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    #[default]
    PocketBase,
    Sqlite,
}

/// Which store backs identities, arrivals and detections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub provider: StoreProvider,
    /// Database file for the SQLite provider. `:memory:` is accepted.
    pub sqlite_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: StoreProvider::PocketBase,
            sqlite_path: PathBuf::from("rollcall.db"),
        }
    }
}

/// PocketBase REST connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PocketBaseConfig {
    pub url: String,
    /// Sent verbatim as the `Authorization` header when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PocketBaseConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8090".to_string(),
            token: None,
            timeout_secs: 10,
        }
    }
}

/// Telegram Bot API delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Without a token, notifications are only logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// Chat that receives late-arrival alerts. Admin messages are skipped when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_chat_id: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            admin_chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Main rollcall configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RollcallConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub store: StoreConfig,
    pub pocketbase: PocketBaseConfig,
    pub telegram: TelegramConfig,
}

impl RollcallConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> RollcallResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| RollcallError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RollcallError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| RollcallError::Configuration(e.to_string())),
            _ => Err(RollcallError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }?;

        config.pipeline.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> RollcallResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from a variable lookup (normally the process environment).
    pub fn with_overrides<F>(mut self, lookup: F) -> RollcallResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ROLLCALL_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("ROLLCALL_PORT") {
            self.server.port = parse_var("ROLLCALL_PORT", &port)?;
        }
        if let Some(threshold) = lookup("ROLLCALL_RSSI_THRESHOLD") {
            self.pipeline.rssi_threshold = parse_var("ROLLCALL_RSSI_THRESHOLD", &threshold)?;
        }
        if let Some(grace) = lookup("ROLLCALL_GRACE_MINUTES") {
            self.pipeline.grace_period_minutes = parse_var("ROLLCALL_GRACE_MINUTES", &grace)?;
        }

        if let Some(provider) = lookup("ROLLCALL_STORE") {
            self.store.provider = match provider.to_lowercase().as_str() {
                "pocketbase" => StoreProvider::PocketBase,
                "sqlite" => StoreProvider::Sqlite,
                other => {
                    return Err(RollcallError::Configuration(format!(
                        "ROLLCALL_STORE must be 'pocketbase' or 'sqlite', got '{}'",
                        other
                    )))
                }
            };
        }
        if let Some(path) = lookup("ROLLCALL_SQLITE_PATH") {
            self.store.sqlite_path = PathBuf::from(path);
        }

        if let Some(url) = non_empty(lookup("POCKETBASE_URL")) {
            self.pocketbase.url = url;
        }
        if let Some(token) = non_empty(lookup("POCKETBASE_TOKEN")) {
            self.pocketbase.token = Some(token);
        }

        if let Some(token) = non_empty(lookup("TELEGRAM_BOT_TOKEN")) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = non_empty(lookup("AUTHORIZED_CHAT_ID")) {
            self.telegram.admin_chat_id = Some(chat_id);
        }

        self.pipeline.validate()?;
        Ok(self)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> RollcallConfigBuilder {
        RollcallConfigBuilder::default()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> RollcallResult<T> {
    value.trim().parse().map_err(|_| {
        RollcallError::Configuration(format!("{} has an invalid value: '{}'", key, value))
    })
}

/// Builder for RollcallConfig.
#[derive(Default)]
pub struct RollcallConfigBuilder {
    config: RollcallConfig,
}

impl RollcallConfigBuilder {
    /// Set the listen address.
    pub fn listen(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.server.host = host.into();
        self.config.server.port = port;
        self
    }

    /// Set the proximity threshold.
    pub fn rssi_threshold(mut self, threshold: i32) -> Self {
        self.config.pipeline.rssi_threshold = threshold;
        self
    }

    /// Set the grace period in minutes.
    pub fn grace_period_minutes(mut self, minutes: i64) -> Self {
        self.config.pipeline.grace_period_minutes = minutes;
        self
    }

    /// Use the SQLite store at the given path.
    pub fn sqlite(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store.provider = StoreProvider::Sqlite;
        self.config.store.sqlite_path = path.into();
        self
    }

    /// Use the PocketBase store.
    pub fn pocketbase(mut self, url: impl Into<String>, token: Option<String>) -> Self {
        self.config.store.provider = StoreProvider::PocketBase;
        self.config.pocketbase.url = url.into();
        self.config.pocketbase.token = token;
        self
    }

    /// Enable Telegram delivery.
    pub fn telegram(mut self, bot_token: impl Into<String>, admin_chat_id: Option<String>) -> Self {
        self.config.telegram.bot_token = Some(bot_token.into());
        self.config.telegram.admin_chat_id = admin_chat_id;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RollcallConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RollcallConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.pipeline.rssi_threshold, -70);
        assert_eq!(config.pipeline.grace_period(), chrono::Duration::minutes(5));
        assert_eq!(config.store.provider, StoreProvider::PocketBase);
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = RollcallConfig::default()
            .with_overrides(lookup(&[
                ("ROLLCALL_PORT", "9000"),
                ("ROLLCALL_RSSI_THRESHOLD", "-80"),
                ("ROLLCALL_STORE", "SQLite"),
                ("ROLLCALL_SQLITE_PATH", "/tmp/rc.db"),
                ("POCKETBASE_URL", "http://pb:8090"),
                ("POCKETBASE_TOKEN", ""),
                ("TELEGRAM_BOT_TOKEN", "123:abc"),
                ("AUTHORIZED_CHAT_ID", "-1001"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.pipeline.rssi_threshold, -80);
        assert_eq!(config.store.provider, StoreProvider::Sqlite);
        assert_eq!(config.store.sqlite_path, PathBuf::from("/tmp/rc.db"));
        assert_eq!(config.pocketbase.url, "http://pb:8090");
        assert!(config.pocketbase.token.is_none());
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram.admin_chat_id.as_deref(), Some("-1001"));
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let err = RollcallConfig::default()
            .with_overrides(lookup(&[("ROLLCALL_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("ROLLCALL_PORT"));

        let err = RollcallConfig::default()
            .with_overrides(lookup(&[("ROLLCALL_STORE", "mongo")]))
            .unwrap_err();
        assert!(matches!(err, RollcallError::Configuration(_)));
    }

    #[test]
    fn test_grace_period_range() {
        let err = RollcallConfig::default()
            .with_overrides(lookup(&[("ROLLCALL_GRACE_MINUTES", "-5")]))
            .unwrap_err();
        assert!(matches!(err, RollcallError::Configuration(_)));

        let err = RollcallConfig::default()
            .with_overrides(lookup(&[("ROLLCALL_GRACE_MINUTES", "9223372036854775807")]))
            .unwrap_err();
        assert!(err.to_string().contains("grace period"));

        let config = RollcallConfig::default()
            .with_overrides(lookup(&[("ROLLCALL_GRACE_MINUTES", "0")]))
            .unwrap();
        assert_eq!(config.pipeline.grace_period(), chrono::Duration::zero());
    }

    #[test]
    fn test_out_of_range_grace_is_clamped() {
        let config = RollcallConfig::builder().grace_period_minutes(i64::MAX).build();
        assert!(config.pipeline.validate().is_err());
        assert_eq!(
            config.pipeline.grace_period(),
            chrono::Duration::minutes(MAX_GRACE_PERIOD_MINUTES)
        );
    }

    #[test]
    fn test_file_with_negative_grace_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"pipeline": {{"grace_period_minutes": -1}}}}"#).unwrap();
        assert!(matches!(
            RollcallConfig::from_file(file.path()),
            Err(RollcallError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[pipeline]
rssi_threshold = -65

[store]
provider = "sqlite"
sqlite_path = "attendance.db"
"#
        )
        .unwrap();

        let config = RollcallConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pipeline.rssi_threshold, -65);
        assert_eq!(config.pipeline.grace_period_minutes, 5);
        assert_eq!(config.store.provider, StoreProvider::Sqlite);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "telegram:\n  bot_token: \"42:xyz\"\nserver:\n  port: 8181").unwrap();

        let config = RollcallConfig::from_file(file.path()).unwrap();
        assert_eq!(config.telegram.bot_token.as_deref(), Some("42:xyz"));
        assert_eq!(config.server.port, 8181);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(RollcallConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_builder() {
        let config = RollcallConfig::builder()
            .listen("127.0.0.1", 3000)
            .rssi_threshold(-75)
            .sqlite(":memory:")
            .telegram("t", Some("1".to_string()))
            .build();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.pipeline.rssi_threshold, -75);
        assert_eq!(config.store.provider, StoreProvider::Sqlite);
        assert_eq!(config.telegram.admin_chat_id.as_deref(), Some("1"));
    }
}

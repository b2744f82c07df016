//! Configuration utilities - loading and path helpers
//!
//! The loaded config is returned by value and handed to `DashboardClient`;
//! there is no global config instance.

use super::schemas::{
    ApiConfig, ClientConfig, LoggingConfig, LogsConfig, NotificationConfig, PollingConfig,
    StorageConfig, VisibilityConfig,
};
use crate::errors::{ClientError, ClientResult};
use crate::logger::{self, LogTag};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE_PATH: &str = "tradedeck.toml";

/// Load configuration from a TOML file
///
/// A missing file yields defaults (with a warning); an unreadable or
/// malformed file is an error.
pub fn load_config_from_path(path: &Path) -> ClientResult<ClientConfig> {
    if !path.exists() {
        logger::warning(
            LogTag::System,
            &format!("Config file '{}' not found, using default values", path.display()),
        );
        return Ok(ClientConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        ClientError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
    })?;

    parse_config(&contents).map_err(|e| {
        ClientError::Config(format!("Failed to parse config file '{}': {}", path.display(), e))
    })
}

/// Parse configuration text; absent sections and fields take their defaults
pub fn parse_config(contents: &str) -> ClientResult<ClientConfig> {
    let config: ClientConfig = toml::from_str(contents)?;
    validate(&config)?;
    if let Ok(raw) = contents.parse::<toml::Table>() {
        for key in unknown_keys(&raw) {
            logger::warning(LogTag::System, &format!("Ignoring unknown config key '{}'", key));
        }
    }
    Ok(config)
}

fn section_fields(section: &str) -> Option<&'static [&'static str]> {
    Some(match section {
        "api" => ApiConfig::FIELDS,
        "polling" => PollingConfig::FIELDS,
        "visibility" => VisibilityConfig::FIELDS,
        "notifications" => NotificationConfig::FIELDS,
        "logs" => LogsConfig::FIELDS,
        "storage" => StorageConfig::FIELDS,
        "logging" => LoggingConfig::FIELDS,
        _ => return None,
    })
}

/// Dotted paths of keys serde silently skipped
fn unknown_keys(raw: &toml::Table) -> Vec<String> {
    let mut unknown = Vec::new();
    for (section, value) in raw {
        let Some(fields) = section_fields(section) else {
            unknown.push(section.clone());
            continue;
        };
        if let Some(table) = value.as_table() {
            unknown.extend(
                table
                    .keys()
                    .filter(|key| !fields.contains(&key.as_str()))
                    .map(|key| format!("{}.{}", section, key)),
            );
        }
    }
    unknown
}

fn validate(config: &ClientConfig) -> ClientResult<()> {
    url::Url::parse(&config.api.base_url)?;

    let intervals = [
        ("dashboard_interval_ms", config.polling.dashboard_interval_ms),
        ("engine_interval_ms", config.polling.engine_interval_ms),
        ("queue_interval_ms", config.polling.queue_interval_ms),
        ("logs_interval_ms", config.polling.logs_interval_ms),
    ];
    for (name, value) in intervals {
        if value == 0 {
            return Err(ClientError::Config(format!("polling.{} must be greater than 0", name)));
        }
    }

    if config.notifications.ttl_ms == 0 {
        return Err(ClientError::Config("notifications.ttl_ms must be greater than 0".to_string()));
    }
    Ok(())
}

/// Resolve the session file path, falling back to the platform data dir
pub fn session_path(config: &ClientConfig) -> PathBuf {
    if !config.storage.session_path.trim().is_empty() {
        return PathBuf::from(&config.storage.session_path);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tradedeck")
        .join("session.json")
}

//! Configuration schema
//!
//! One section per concern; every field has a default so an empty or
//! missing file yields a working client against a local engine.

use crate::config_struct;
use crate::logger::LogLevel;

// ============================================================================
// API
// ============================================================================

config_struct! {
    /// Engine API endpoint settings
    pub struct ApiConfig {
        /// Base URL of the engine's JSON API
        base_url: String = "http://127.0.0.1:8000".to_string(),
        /// Per-request timeout enforced by the HTTP client
        timeout_secs: u64 = 15,
    }
}

// ============================================================================
// POLLING
// ============================================================================

config_struct! {
    /// Background refresh cadence per data store
    pub struct PollingConfig {
        dashboard_interval_ms: u64 = 10_000,
        engine_interval_ms: u64 = 5_000,
        queue_interval_ms: u64 = 5_000,
        logs_interval_ms: u64 = 3_000,
    }
}

// ============================================================================
// VISIBILITY
// ============================================================================

config_struct! {
    /// Refresh-on-return behavior
    pub struct VisibilityConfig {
        enabled: bool = true,
        /// Hidden time (strictly greater) that triggers a refresh on return
        threshold_ms: u64 = 2_000,
    }
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

config_struct! {
    pub struct NotificationConfig {
        /// Lifetime of a notification before automatic removal
        ttl_ms: u64 = 6_000,
    }
}

// ============================================================================
// LOGS
// ============================================================================

config_struct! {
    /// Engine log tail shown by the logs store
    pub struct LogsConfig {
        tail_limit: usize = 200,
    }
}

// ============================================================================
// STORAGE
// ============================================================================

config_struct! {
    /// Persisted session location
    pub struct StorageConfig {
        /// Session file; empty means `<data dir>/tradedeck/session.json`
        session_path: String = String::new(),
    }
}

// ============================================================================
// LOGGING
// ============================================================================

config_struct! {
    pub struct LoggingConfig {
        /// error | warning | info | debug | verbose
        min_level: LogLevel = LogLevel::Info,
        /// Log file; empty disables file logging
        file_path: String = String::new(),
        /// Tags with debug output enabled (same keys as --debug)
        debug_tags: Vec<String> = Vec::new(),
        /// If set, info and warning output is limited to these tags
        only_tags: Vec<String> = Vec::new(),
    }
}

// ============================================================================
// ROOT
// ============================================================================

config_struct! {
    /// Root client configuration (`tradedeck.toml`)
    pub struct ClientConfig {
        api: ApiConfig = ApiConfig::default(),
        polling: PollingConfig = PollingConfig::default(),
        visibility: VisibilityConfig = VisibilityConfig::default(),
        notifications: NotificationConfig = NotificationConfig::default(),
        logs: LogsConfig = LogsConfig::default(),
        storage: StorageConfig = StorageConfig::default(),
        logging: LoggingConfig = LoggingConfig::default(),
    }
}

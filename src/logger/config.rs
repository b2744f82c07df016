//! Logger configuration
//!
//! Held in a process-wide cell because logging is called from everywhere,
//! including the `log` facade bridge which cannot carry context.

use super::levels::LogLevel;
use super::tags::LogTag;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Most detailed level that is still printed
    pub min_level: LogLevel,
    /// Tags with debug output enabled
    pub debug_tags: HashSet<LogTag>,
    /// If non-empty, only these tags are printed (errors always pass)
    pub enabled_tags: HashSet<LogTag>,
    /// Console output; disabled while the terminal is in raw mode
    pub console_enabled: bool,
    /// Optional log file
    pub file_path: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
            console_enabled: true,
            file_path: None,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> = Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

pub fn update_logger_config<F: FnOnce(&mut LoggerConfig)>(update: F) {
    update(&mut LOGGER_CONFIG.write());
}

/// Read the config in place without cloning it
pub fn with_logger_config<R, F: FnOnce(&LoggerConfig) -> R>(read: F) -> R {
    read(&LOGGER_CONFIG.read())
}

/// Build a config from debug keys (`--debug api --debug store`)
///
/// Unknown keys are ignored.
pub fn config_from_flags(debug_keys: &[String], verbose: bool, quiet: bool) -> LoggerConfig {
    let debug_tags: HashSet<LogTag> = debug_keys
        .iter()
        .filter_map(|key| LogTag::from_debug_key(key))
        .collect();

    let min_level = if verbose {
        LogLevel::Verbose
    } else if quiet {
        LogLevel::Warning
    } else if !debug_tags.is_empty() {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    LoggerConfig {
        min_level,
        debug_tags,
        ..LoggerConfig::default()
    }
}

//! Record filtering and dispatch

use super::config::{with_logger_config, LoggerConfig};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Decide whether a record passes `config`
///
/// Errors always pass. Verbose records need `min_level = verbose`. Debug
/// records pass under verbose or when their tag was named with `--debug`.
/// Everything else must be within `min_level` and, if an allow-list of tags
/// is set, carry one of those tags.
pub fn should_log_with(config: &LoggerConfig, tag: &LogTag, level: LogLevel) -> bool {
    let verbose = config.min_level == LogLevel::Verbose;
    match level {
        LogLevel::Error => true,
        LogLevel::Verbose => verbose,
        LogLevel::Debug => verbose || config.debug_tags.contains(tag),
        LogLevel::Warning | LogLevel::Info => {
            level <= config.min_level
                && (config.enabled_tags.is_empty() || config.enabled_tags.contains(tag))
        }
    }
}

pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    with_logger_config(|config| should_log_with(config, tag, level))
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if should_log(&tag, level) {
        super::format::format_and_log(tag, level, message);
    }
}

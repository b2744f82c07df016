//! Tagged logger
//!
//! Every record carries a `LogTag` naming the subsystem that produced it.
//! `--debug <tag>` unlocks debug output for one subsystem at a time, while
//! `--verbose` opens everything. Records go to stderr and, when
//! `[logging] file_path` is set, to a log file. Crates that log through the
//! `log` facade (reqwest, hyper) are routed in under `LogTag::External`.
//!
//! ```rust
//! use tradedeck::logger::{self, LogTag};
//!
//! logger::warning(LogTag::Store, "Background refresh failed");
//! logger::debug(LogTag::Polling, "tick"); // needs --debug polling
//! ```

mod bridge;
mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    config_from_flags, get_logger_config, set_logger_config, update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Install `config`, open the log file and hook the `log` facade
pub fn init(config: LoggerConfig) {
    let facade_filter = config.min_level.to_level_filter();
    let file_path = config.file_path.clone();
    set_logger_config(config);

    if let Some(path) = file_path {
        if let Err(e) = file::init_file_logging(&path) {
            warning(
                LogTag::System,
                &format!("Log file {} unavailable: {}", path.display(), e),
            );
        }
    }

    bridge::install(facade_filter);
}

/// Console output is switched off while the terminal is in raw mode
pub fn set_console_enabled(enabled: bool) {
    update_logger_config(|config| config.console_enabled = enabled);
}

pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Shown only when `tag` was passed to `--debug` (or under `--verbose`)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

pub fn flush() {
    file::flush_file_logging();
}

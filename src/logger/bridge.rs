//! `log` facade bridge
//!
//! Routes records emitted through the `log` crate (reqwest, hyper) into the
//! tagged logger under `LogTag::External`.

use super::core::log_internal;
use super::levels::LogLevel;
use super::tags::LogTag;

struct FacadeBridge;

static BRIDGE: FacadeBridge = FacadeBridge;

impl log::Log for FacadeBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        super::core::should_log(&LogTag::External, LogLevel::from(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = format!("{}: {}", record.target(), record.args());
        log_internal(LogTag::External, LogLevel::from(record.level()), &message);
    }

    fn flush(&self) {
        super::file::flush_file_logging();
    }
}

/// Install the bridge; a second call only updates the facade filter
pub fn install(max_level: log::LevelFilter) {
    let _ = log::set_logger(&BRIDGE);
    log::set_max_level(max_level);
}

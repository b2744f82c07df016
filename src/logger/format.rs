//! Log formatting and output
//!
//! Handles:
//! - Colorized console output with tag and level formatting
//! - Plain-text copy for the optional log file
//! - Broken pipe handling for piped commands

use super::config::with_logger_config;
use super::file::write_to_file;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stderr, ErrorKind, Write};

/// Log format widths for alignment
const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 7;

/// Format and output a log message
pub fn format_and_log(tag: LogTag, level: LogLevel, message: &str) {
    let now = Local::now();

    if with_logger_config(|config| config.console_enabled) {
        let line = format!(
            "{} [{}] [{}] {}",
            now.format("%H:%M:%S").to_string().dimmed(),
            pad(tag.to_colored_string(), tag.to_plain_string().len(), TAG_WIDTH),
            pad(level.colored(), level.as_str().len(), LEVEL_WIDTH),
            message
        );
        print_console_safe(&line);
    }

    write_to_file(&format_plain_line(&now.format("%Y-%m-%d %H:%M:%S").to_string(), tag, level, message));
}

/// Line written to the log file
pub fn format_plain_line(timestamp: &str, tag: LogTag, level: LogLevel, message: &str) -> String {
    format!("{} [{}] [{}] {}", timestamp, tag.to_plain_string(), level.as_str(), message)
}

/// Pad a colored string using the width of its visible text
fn pad(colored: ColoredString, visible_len: usize, width: usize) -> String {
    let padding = width.saturating_sub(visible_len);
    format!("{}{}", colored, " ".repeat(padding))
}

/// Console output goes to stderr so stdout stays free for the terminal frame
fn print_console_safe(line: &str) {
    let mut handle = stderr().lock();
    if let Err(e) = writeln!(handle, "{}", line) {
        if e.kind() == ErrorKind::BrokenPipe {
            return;
        }
    }
    let _ = handle.flush();
}

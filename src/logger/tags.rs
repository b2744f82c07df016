//! Log tags identify the subsystem a message comes from.
//!
//! Each tag has a debug key used by `--debug <key>` to enable debug output
//! for that subsystem only.

use colored::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Api,
    Store,
    Polling,
    Visibility,
    Keyboard,
    Confirm,
    Notify,
    Actions,
    Session,
    /// Records forwarded from the `log` facade (reqwest, hyper, ...)
    External,
}

impl LogTag {
    pub const ALL: [LogTag; 11] = [
        LogTag::System,
        LogTag::Api,
        LogTag::Store,
        LogTag::Polling,
        LogTag::Visibility,
        LogTag::Keyboard,
        LogTag::Confirm,
        LogTag::Notify,
        LogTag::Actions,
        LogTag::Session,
        LogTag::External,
    ];

    /// Key used by `--debug <key>`
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system",
            LogTag::Api => "api",
            LogTag::Store => "store",
            LogTag::Polling => "polling",
            LogTag::Visibility => "visibility",
            LogTag::Keyboard => "keyboard",
            LogTag::Confirm => "confirm",
            LogTag::Notify => "notify",
            LogTag::Actions => "actions",
            LogTag::Session => "session",
            LogTag::External => "external",
        }
        .to_string()
    }

    pub fn from_debug_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        Self::ALL.iter().copied().find(|tag| tag.to_debug_key() == key)
    }

    /// Uncolored label for file output
    pub fn to_plain_string(&self) -> String {
        self.to_debug_key().to_uppercase()
    }

    /// Colored label for console output
    pub fn to_colored_string(&self) -> ColoredString {
        let label = self.to_plain_string();
        match self {
            LogTag::System => label.bright_white().bold(),
            LogTag::Api => label.bright_blue().bold(),
            LogTag::Store => label.cyan().bold(),
            LogTag::Polling => label.blue().bold(),
            LogTag::Visibility => label.magenta().bold(),
            LogTag::Keyboard => label.bright_magenta().bold(),
            LogTag::Confirm => label.yellow().bold(),
            LogTag::Notify => label.green().bold(),
            LogTag::Actions => label.bright_yellow().bold(),
            LogTag::Session => label.bright_green().bold(),
            LogTag::External => label.dimmed(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}

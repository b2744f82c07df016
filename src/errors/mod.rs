//! Structured error handling for tradedeck
//!
//! Every error is `Clone` so it can travel through a shared in-flight fetch
//! and reach all joined callers unchanged.

use thiserror::Error;

/// Message shown when the server did not provide one
pub const FALLBACK_ERROR_MESSAGE: &str = "Request failed. Please try again.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Network error: {0}")] Network(String),

    #[error("HTTP {status} from {endpoint}: {}", .message.as_deref().unwrap_or("No message"))] Status {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Parse error: {0}")] Parse(String),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Storage error: {0}")] Storage(String),

    #[error("Task error: {0}")] Task(String),
}

impl ClientError {
    /// Message provided by the server, if the failure carried one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Status { message: Some(message), .. } if !message.trim().is_empty() => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// Text suitable for an error banner or notification
    pub fn user_message(&self) -> String {
        self.server_message().unwrap_or(FALLBACK_ERROR_MESSAGE).to_string()
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(format!("invalid URL: {}", err))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

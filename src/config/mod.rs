//! Client configuration: schema, defaults and TOML loading

mod macros;
mod schemas;
mod utils;

pub use schemas::{
    ApiConfig, ClientConfig, LoggingConfig, LogsConfig, NotificationConfig, PollingConfig,
    StorageConfig, VisibilityConfig,
};
pub use utils::{load_config_from_path, parse_config, session_path, CONFIG_FILE_PATH};

//! Configuration macros
//!
//! `config_struct!` declares a configuration section with its defaults next
//! to each field, so the TOML schema and `Default` never drift apart.

/// Define a configuration struct with embedded defaults
///
/// Expands to the struct (all fields public, `#[serde(default)]`), its
/// `Default` impl, and a `FIELDS` list of key names that the loader uses to
/// flag typos in `tradedeck.toml`.
///
/// # Example
/// ```
/// tradedeck::config_struct! {
///     pub struct PollingConfig {
///         queue_interval_ms: u64 = 5_000,
///         enabled: bool = true,
///     }
/// }
///
/// let polling = PollingConfig::default();
/// assert_eq!(polling.queue_interval_ms, 5_000);
/// assert_eq!(PollingConfig::FIELDS, &["queue_interval_ms", "enabled"]);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl $name {
            /// TOML keys accepted in this section
            pub const FIELDS: &'static [&'static str] = &[$(stringify!($field_name)),*];
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}

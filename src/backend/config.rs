use std::env;
use std::path::PathBuf;

use tracing::warn;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding every record file.
    pub data_dir: PathBuf,
    pub bind: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bind: DEFAULT_BIND.to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Reads `PORTAL_DATA_DIR`, `PORTAL_BIND` and `PORTAL_LOG_JSON`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let data_dir = lookup("PORTAL_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let bind = match lookup("PORTAL_BIND") {
            Some(v) if v.contains(':') => v,
            Some(v) => {
                warn!(value = %v, "PORTAL_BIND must be host:port, using default");
                defaults.bind
            }
            None => defaults.bind,
        };

        let log_json = match lookup("PORTAL_LOG_JSON").as_deref() {
            None => defaults.log_json,
            Some(v) => parse_bool(v).unwrap_or_else(|| {
                warn!(value = %v, "PORTAL_LOG_JSON is not a boolean, using default");
                defaults.log_json
            }),
        };

        Self {
            data_dir,
            bind,
            log_json,
        }
    }
}

/// Reads only `PORTAL_LOG_JSON`, and silently. Logging is configured from
/// this before any subscriber exists to receive warnings.
pub fn log_json_from_env() -> bool {
    log_json_from_lookup(|name| env::var(name).ok())
}

pub fn log_json_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup("PORTAL_LOG_JSON")
        .as_deref()
        .and_then(parse_bool)
        .unwrap_or(Config::default().log_json)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

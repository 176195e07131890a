//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;

use crate::limits::{UploadLimits, parse_byte_size};

/// Runtime configuration for dictapi-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Upload size ceilings (`DICTAPI_UPLOAD_MAX_FILESIZE`,
    /// `DICTAPI_POST_MAX_SIZE`, `DICTAPI_MEMORY_LIMIT`).
    pub limits: UploadLimits,

    /// Text encoding the transport delivers form fields in. `None` is UTF-8.
    pub input_encoding: Option<String>,

    /// Directory uploaded files are spooled into.
    pub upload_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            limits: UploadLimits::default(),
            input_encoding: None,
            upload_dir: std::env::temp_dir(),
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env_or("DICTAPI_BIND", &defaults.bind_address),
            log_level: env_or("DICTAPI_LOG", &defaults.log_level),
            log_json: std::env::var("DICTAPI_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.log_json),
            limits: UploadLimits {
                upload_max_filesize: bytes_env(
                    "DICTAPI_UPLOAD_MAX_FILESIZE",
                    defaults.limits.upload_max_filesize,
                ),
                post_max_size: bytes_env("DICTAPI_POST_MAX_SIZE", defaults.limits.post_max_size),
                memory_limit: bytes_env("DICTAPI_MEMORY_LIMIT", defaults.limits.memory_limit),
            },
            input_encoding: std::env::var("DICTAPI_INPUT_ENCODING")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            upload_dir: std::env::var_os("DICTAPI_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Byte-size variables are checked here so nothing downstream has to cope
/// with an unparsable limit. Tracing is not up yet, hence stderr.
fn bytes_env(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(value) => parse_byte_size(&value).unwrap_or_else(|| {
            eprintln!("WARN: {key}='{value}' is not a valid byte size; falling back to {default}");
            default
        }),
        Err(_) => default,
    }
}

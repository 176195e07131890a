//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use dictapi_convert::Converter;

use crate::config::Config;
use crate::request::encoding::FieldCodec;

/// Read-only state shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Effective upload limit, resolved once from `config.limits`.
    pub upload_limit: u64,
    /// Transport field encoding.
    pub codec: FieldCodec,
    /// Parse/serialize collaborator.
    pub converter: Arc<dyn Converter>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("upload_limit", &self.upload_limit)
            .field("codec", &self.codec.name())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: Config, converter: Arc<dyn Converter>) -> Self {
        Self {
            upload_limit: config.limits.resolve(),
            codec: FieldCodec::from_label(config.input_encoding.as_deref()),
            config: Arc::new(config),
            converter,
        }
    }
}

//! Baling errors

use combine_core::CoreError;
use combine_lookup::LookupError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Missing `{0}` in the [baler] section of the settings file")]
    MissingSetting(&'static str),

    #[error("HTTP client error: {0}")]
    Client(#[from] LookupError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

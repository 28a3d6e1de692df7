//! Errors raised while preparing a winnowing run

use combine_core::CoreError;
use combine_lookup::LookupError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WinnowError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Could not open {what} at {path}: {reason}")]
    Setup {
        what: &'static str,
        path: String,
        reason: String,
    },
}

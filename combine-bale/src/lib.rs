//! Combine Baling
//!
//! The last stage of the pipeline: finalized indicators are either written
//! to a local file (JSON, CSV or CEF) or republished one by one to a
//! CRITs-style intelligence platform by a pool of workers.

pub mod error;
pub mod formats;
pub mod publisher;

pub use error::*;
pub use formats::*;
pub use publisher::*;

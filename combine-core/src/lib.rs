//! Combine Core - Indicator data model and static lookups
//!
//! This crate provides the foundational primitives:
//! - Threat indicators and their enrichment results
//! - Sorted AS range index
//! - Reserved-range filter for non-routable IPv4 space
//! - Feed plugin interface
//! - Settings file

pub mod config;
pub mod enrichment;
pub mod error;
pub mod feed;
pub mod indicator;
pub mod ranges;
pub mod reserved;

pub use config::*;
pub use enrichment::*;
pub use error::*;
pub use feed::*;
pub use indicator::*;
pub use ranges::*;
pub use reserved::*;

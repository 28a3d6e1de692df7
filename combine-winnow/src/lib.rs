//! Combine Winnowing
//!
//! Turns harvested indicators into two ordered streams:
//! - **Filtered**: every indicator that passed validation and the
//!   reserved-range check, in input order
//! - **Enriched**: the filtered indicators that went through an enrichment
//!   attempt, each paired with its (possibly empty) result
//!
//! Classification is pure. Enrichment consults the lookup services held by a
//! [`WinnowContext`] and is all-or-nothing per indicator.

pub mod classifier;
pub mod context;
pub mod enricher;
pub mod error;
pub mod winnower;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::*;
pub use context::*;
pub use enricher::*;
pub use error::*;
pub use winnower::*;

//! Combine Lookup Services
//!
//! External collaborators consulted while winnowing:
//! - Live DNS resolution (PTR, A, MX)
//! - Passive-DNS history (DNSDB API)
//! - GeoIP country lookup (MMDB)
//! - TLD validity list (IANA)
//!
//! Each service sits behind a trait so the winnowing engine can be driven by
//! in-memory fakes.

pub mod dns;
pub mod error;
pub mod geo;
pub mod http;
pub mod passive;
pub mod tld;

pub use dns::*;
pub use error::*;
pub use geo::*;
pub use http::*;
pub use passive::*;
pub use tld::*;

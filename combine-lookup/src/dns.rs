//! Live DNS resolution
//!
//! Every query either returns at least one record or fails; an empty answer
//! is reported as a failure so callers have a single error channel.

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use std::time::Duration;

use crate::LookupError;

/// Default resolution timeout in seconds
const DNS_TIMEOUT_SECS: u64 = 5;

/// Live DNS queries used for enrichment
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// PTR names for an address, in answer order
    async fn ptr(&self, addr: IpAddr) -> Result<Vec<String>, LookupError>;

    /// A record addresses for a domain
    async fn a(&self, domain: &str) -> Result<Vec<String>, LookupError>;

    /// MX exchange hostnames for a domain
    async fn mx(&self, domain: &str) -> Result<Vec<String>, LookupError>;
}

/// Resolver backed by hickory, created once per run and reused
pub struct HickoryResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryResolver {
    /// Use the host's resolver configuration (`/etc/resolv.conf`)
    pub fn from_system_conf() -> Result<Self, LookupError> {
        let (config, mut opts) = hickory_resolver::system_conf::read_system_conf().map_err(|e| {
            LookupError::Dns {
                query: "system configuration".to_string(),
                reason: e.to_string(),
            }
        })?;
        opts.timeout = Duration::from_secs(DNS_TIMEOUT_SECS);
        Ok(Self::new(config, opts))
    }

    pub fn new(config: ResolverConfig, opts: ResolverOpts) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

fn dns_error(query: &str, reason: impl ToString) -> LookupError {
    LookupError::Dns {
        query: query.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty(query: &str, records: Vec<String>) -> Result<Vec<String>, LookupError> {
    if records.is_empty() {
        Err(dns_error(query, "no records"))
    } else {
        Ok(records)
    }
}

#[async_trait]
impl DnsResolver for HickoryResolver {
    async fn ptr(&self, addr: IpAddr) -> Result<Vec<String>, LookupError> {
        let query = addr.to_string();
        let lookup = self
            .resolver
            .reverse_lookup(addr)
            .await
            .map_err(|e| dns_error(&query, e))?;
        non_empty(&query, lookup.iter().map(|name| name.to_string()).collect())
    }

    async fn a(&self, domain: &str) -> Result<Vec<String>, LookupError> {
        let lookup = self
            .resolver
            .ipv4_lookup(domain)
            .await
            .map_err(|e| dns_error(domain, e))?;
        non_empty(domain, lookup.iter().map(|a| a.to_string()).collect())
    }

    async fn mx(&self, domain: &str) -> Result<Vec<String>, LookupError> {
        let lookup = self
            .resolver
            .mx_lookup(domain)
            .await
            .map_err(|e| dns_error(domain, e))?;
        non_empty(
            domain,
            lookup.iter().map(|mx| mx.exchange().to_string()).collect(),
        )
    }
}

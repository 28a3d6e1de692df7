//! Enrichment Resolver
//!
//! Gathers network metadata for one indicator at a time. All lookups for an
//! indicator run in sequence and the first failure discards everything
//! gathered so far: a result is either complete or empty, never partial.

use chrono::NaiveDate;
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, error};

use combine_core::{EmptyReason, Enrichment, EnrichmentData, Indicator, RangeIndex};
use combine_lookup::{
    filter_day, max_hits, DnsResolver, GeoLookup, LookupError, PassiveDns,
};

use crate::EnrichKind;

/// Borrowed view of the lookup services, cheap to copy into concurrent tasks
#[derive(Clone, Copy)]
pub struct EnrichmentResolver<'a> {
    ranges: &'a RangeIndex,
    geo: Option<&'a dyn GeoLookup>,
    dns: &'a dyn DnsResolver,
    passive: Option<&'a dyn PassiveDns>,
}

impl<'a> EnrichmentResolver<'a> {
    pub fn new(
        ranges: &'a RangeIndex,
        geo: Option<&'a dyn GeoLookup>,
        dns: &'a dyn DnsResolver,
        passive: Option<&'a dyn PassiveDns>,
    ) -> Self {
        Self {
            ranges,
            geo,
            dns,
            passive,
        }
    }

    /// Enrich an indicator the way its classification asks for
    pub async fn enrich(&self, indicator: &Indicator, kind: EnrichKind) -> Enrichment {
        match kind {
            EnrichKind::Ipv4(addr) => self.enrich_ipv4(addr).await,
            EnrichKind::Fqdn => self.enrich_fqdn(&indicator.value, indicator.date).await,
            EnrichKind::Hash => self.enrich_hash(&indicator.value),
        }
    }

    /// AS, country, PTR name and (if available) the most observed passive name
    pub async fn enrich_ipv4(&self, addr: Ipv4Addr) -> Enrichment {
        match self.try_enrich_ipv4(addr).await {
            Ok(data) => Enrichment::Populated(data),
            Err(e) => {
                error!("enrich_ipv4: enriching address {} failed: {}", addr, e);
                Enrichment::failed(e)
            }
        }
    }

    async fn try_enrich_ipv4(&self, addr: Ipv4Addr) -> Result<EnrichmentData, LookupError> {
        let mut data = EnrichmentData::default();

        if let Some(org) = self.ranges.lookup(addr) {
            data.as_num = org.number;
            data.as_name = Some(org.name.clone());
        }

        if let Some(geo) = self.geo {
            data.country = geo.country_of(addr)?;
        }

        let names = self.dns.ptr(IpAddr::V4(addr)).await?;
        data.hostname = names.into_iter().next().filter(|name| !name.is_empty());

        if let Some(passive) = self.passive {
            let observed = passive.by_address(IpAddr::V4(addr)).await?;
            data.passive_hostname = max_hits(&observed);
        }

        Ok(data)
    }

    /// Most observed A answer on the indicator's date, live MX and live A
    pub async fn enrich_fqdn(&self, domain: &str, date: NaiveDate) -> Enrichment {
        match self.try_enrich_fqdn(domain, date).await {
            Ok(data) => Enrichment::Populated(data),
            Err(e) => {
                error!("enrich_fqdn: enriching domain {} failed: {}", domain, e);
                Enrichment::failed(e)
            }
        }
    }

    async fn try_enrich_fqdn(
        &self,
        domain: &str,
        date: NaiveDate,
    ) -> Result<EnrichmentData, LookupError> {
        let mut data = EnrichmentData::default();

        if let Some(passive) = self.passive {
            let records = filter_day(passive.rrset(domain, "A").await?, date);
            data.passive_hostname = max_hits(&records);
        }

        data.mx = self.dns.mx(domain).await?;
        data.a = self.dns.a(domain).await?;

        Ok(data)
    }

    /// Hashes have no enrichment source yet; the attempt is recorded as empty
    pub fn enrich_hash(&self, hash: &str) -> Enrichment {
        debug!("No enrichment available for hash {}", hash);
        Enrichment::Empty {
            reason: EmptyReason::Unsupported,
        }
    }
}

//! Lookup state shared by one winnowing run
//!
//! Everything here is built once before the first indicator is processed and
//! only read afterwards.

use reqwest::Client;
use std::fs::File;
use std::io::BufReader;
use tracing::info;

use combine_core::{RangeIndex, WinnowerSettings};
use combine_lookup::{
    DnsResolver, DnsdbClient, GeoLookup, HickoryResolver, MmdbCountry, PassiveDns, TldList,
    TldValidator,
};

use crate::{EnrichmentResolver, WinnowError};

/// Which indicator types get an enrichment attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentToggles {
    pub ipv4: bool,
    pub fqdn: bool,
    pub hash: bool,
}

impl EnrichmentToggles {
    pub fn all() -> Self {
        Self {
            ipv4: true,
            fqdn: true,
            hash: true,
        }
    }

    /// Passive DNS only feeds address and domain enrichment
    pub fn wants_passive(&self) -> bool {
        self.ipv4 || self.fqdn
    }
}

/// Lookup services and switches for a winnowing run
pub struct WinnowContext {
    ranges: RangeIndex,
    geo: Option<Box<dyn GeoLookup>>,
    dns: Box<dyn DnsResolver>,
    passive: Option<Box<dyn PassiveDns>>,
    tld: Box<dyn TldValidator>,
    toggles: EnrichmentToggles,
    concurrency: usize,
}

impl WinnowContext {
    pub fn new(dns: Box<dyn DnsResolver>, tld: Box<dyn TldValidator>) -> Self {
        Self {
            ranges: RangeIndex::default(),
            geo: None,
            dns,
            passive: None,
            tld,
            toggles: EnrichmentToggles::default(),
            concurrency: 1,
        }
    }

    pub fn with_ranges(mut self, ranges: RangeIndex) -> Self {
        self.ranges = ranges;
        self
    }

    pub fn with_geo(mut self, geo: Box<dyn GeoLookup>) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn with_passive(mut self, passive: Box<dyn PassiveDns>) -> Self {
        self.passive = Some(passive);
        self
    }

    pub fn with_toggles(mut self, toggles: EnrichmentToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Number of indicators enriched at once (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Build the context described by the `[winnower]` settings
    ///
    /// Range and country data are only loaded when IPv4 enrichment is on.
    /// Passive DNS is only set up for address or domain enrichment, and is
    /// dropped, not treated as an error, when the key is missing or the
    /// service does not answer a known lookup.
    pub async fn from_settings(
        settings: &WinnowerSettings,
        http: &Client,
    ) -> Result<Self, WinnowError> {
        let toggles = EnrichmentToggles {
            ipv4: settings.enrich_ip,
            fqdn: settings.enrich_dns,
            hash: settings.enrich_hash,
        };

        let tld = TldList::load_or_refresh(http, &settings.tld_list).await?;
        let dns = HickoryResolver::from_system_conf()?;

        let mut context = Self::new(Box::new(dns), Box::new(tld))
            .with_toggles(toggles)
            .with_concurrency(settings.enrich_concurrency);

        if toggles.ipv4 {
            info!("Loading GeoIP data");
            let file = File::open(&settings.gi_org_loc).map_err(|e| WinnowError::Setup {
                what: "AS range data",
                path: settings.gi_org_loc.display().to_string(),
                reason: e.to_string(),
            })?;
            let ranges = RangeIndex::from_reader(BufReader::new(file))?;
            info!("Loaded {} AS ranges", ranges.len());

            let geo = MmdbCountry::open(&settings.gi_data_loc)?;
            context = context.with_ranges(ranges).with_geo(Box::new(geo));
        }

        if !toggles.wants_passive() {
            info!("Address and domain enrichment disabled, skipping passive DNS");
            return Ok(context);
        }

        info!("Setting up passive DNS client");
        match settings.dnsdb_key() {
            Some(key) => {
                let client = DnsdbClient::new(http.clone(), &settings.dnsdb_server, key);
                if client.is_available().await {
                    context = context.with_passive(Box::new(client));
                } else {
                    info!("Invalid passive DNS configuration found, continuing without it");
                }
            }
            None => info!("No passive DNS key configured, continuing without it"),
        }

        Ok(context)
    }

    pub fn toggles(&self) -> EnrichmentToggles {
        self.toggles
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn tld(&self) -> &dyn TldValidator {
        self.tld.as_ref()
    }

    pub fn has_passive(&self) -> bool {
        self.passive.is_some()
    }

    pub fn resolver(&self) -> EnrichmentResolver<'_> {
        EnrichmentResolver::new(
            &self.ranges,
            self.geo.as_deref(),
            self.dns.as_ref(),
            self.passive.as_deref(),
        )
    }
}

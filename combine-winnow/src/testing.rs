//! In-memory lookup services for tests

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use combine_core::{Direction, Indicator, IndicatorType};
use combine_lookup::{
    DnsResolver, GeoLookup, LookupError, PassiveDns, PassiveName, PassiveRecord, TldList,
};

pub fn tlds() -> TldList {
    TldList::parse("COM\nNET\nORG\nEXAMPLE\n")
}

pub fn indicator(value: &str, kind: &str) -> Indicator {
    Indicator::new(
        value,
        IndicatorType::from(kind),
        Direction::Inbound,
        "test feed",
        "https://feed.example/list.txt",
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
    )
}

fn missing(query: &str) -> LookupError {
    LookupError::Dns {
        query: query.to_string(),
        reason: "no answer".to_string(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Resolver answering from fixed tables; unknown queries fail
#[derive(Default)]
pub struct FakeDns {
    ptr: HashMap<String, Vec<String>>,
    a: HashMap<String, Vec<String>>,
    mx: HashMap<String, Vec<String>>,
    delays: HashMap<String, u64>,
}

impl FakeDns {
    pub fn ptr(mut self, addr: &str, names: &[&str]) -> Self {
        self.ptr.insert(addr.to_string(), strings(names));
        self
    }

    pub fn a(mut self, domain: &str, addrs: &[&str]) -> Self {
        self.a.insert(domain.to_string(), strings(addrs));
        self
    }

    pub fn mx(mut self, domain: &str, hosts: &[&str]) -> Self {
        self.mx.insert(domain.to_string(), strings(hosts));
        self
    }

    /// Delay every answer for `query` by `millis`
    pub fn delay(mut self, query: &str, millis: u64) -> Self {
        self.delays.insert(query.to_string(), millis);
        self
    }

    async fn answer(
        &self,
        table: &HashMap<String, Vec<String>>,
        query: &str,
    ) -> Result<Vec<String>, LookupError> {
        if let Some(millis) = self.delays.get(query) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }
        table.get(query).cloned().ok_or_else(|| missing(query))
    }
}

#[async_trait]
impl DnsResolver for FakeDns {
    async fn ptr(&self, addr: IpAddr) -> Result<Vec<String>, LookupError> {
        self.answer(&self.ptr, &addr.to_string()).await
    }

    async fn a(&self, domain: &str) -> Result<Vec<String>, LookupError> {
        self.answer(&self.a, domain).await
    }

    async fn mx(&self, domain: &str) -> Result<Vec<String>, LookupError> {
        self.answer(&self.mx, domain).await
    }
}

/// Country table, or a database that always errors
#[derive(Default)]
pub struct FakeGeo {
    countries: HashMap<Ipv4Addr, String>,
    broken: bool,
}

impl FakeGeo {
    pub fn with(addr: &str, country: &str) -> Self {
        let mut geo = Self::default();
        geo.countries
            .insert(addr.parse().unwrap(), country.to_string());
        geo
    }

    pub fn failing() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }
}

impl GeoLookup for FakeGeo {
    fn country_of(&self, addr: Ipv4Addr) -> Result<Option<String>, LookupError> {
        if self.broken {
            return Err(LookupError::Geo("database unreadable".to_string()));
        }
        Ok(self.countries.get(&addr).cloned())
    }
}

/// Passive-DNS tables; unknown queries fail
#[derive(Default)]
pub struct FakePassive {
    names: HashMap<String, Vec<PassiveName>>,
    rrsets: HashMap<String, Vec<PassiveRecord>>,
}

impl FakePassive {
    pub fn names(mut self, addr: &str, names: Vec<PassiveName>) -> Self {
        self.names.insert(addr.to_string(), names);
        self
    }

    pub fn rrset(mut self, name: &str, records: Vec<PassiveRecord>) -> Self {
        self.rrsets.insert(name.to_string(), records);
        self
    }
}

#[async_trait]
impl PassiveDns for FakePassive {
    async fn by_address(&self, addr: IpAddr) -> Result<Vec<PassiveName>, LookupError> {
        let key = addr.to_string();
        self.names.get(&key).cloned().ok_or_else(|| missing(&key))
    }

    async fn rrset(&self, name: &str, _rrtype: &str) -> Result<Vec<PassiveRecord>, LookupError> {
        self.rrsets.get(name).cloned().ok_or_else(|| missing(name))
    }
}

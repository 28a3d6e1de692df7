//! Passive-DNS history
//!
//! Queries a DNSDB-compatible API for historical resolutions. Results carry
//! observation counts so callers can pick the most observed answer.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::IpAddr;
use tracing::{debug, info};

use crate::LookupError;

/// A name observed resolving to an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveName {
    pub name: String,
    pub count: u64,
}

/// One observed resource record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveRecord {
    pub data: Vec<String>,
    pub count: u64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Historical DNS observations
#[async_trait]
pub trait PassiveDns: Send + Sync {
    /// Names observed pointing at `addr`
    async fn by_address(&self, addr: IpAddr) -> Result<Vec<PassiveName>, LookupError>;

    /// Record sets of type `rrtype` observed for `name`
    async fn rrset(&self, name: &str, rrtype: &str) -> Result<Vec<PassiveRecord>, LookupError>;
}

/// Anything carrying an observation count and a label
pub trait Observed {
    fn label(&self) -> Option<&str>;
    fn count(&self) -> u64;
}

impl Observed for PassiveName {
    fn label(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl Observed for PassiveRecord {
    fn label(&self) -> Option<&str> {
        self.data.first().map(String::as_str)
    }

    fn count(&self) -> u64 {
        self.count
    }
}

/// Label of the most observed record, trailing dots removed
///
/// The first record wins ties. Records with a zero count are never chosen.
pub fn max_hits<T: Observed>(records: &[T]) -> Option<String> {
    let mut best = 0;
    let mut label = None;
    for record in records {
        if record.count() > best {
            best = record.count();
            label = record.label();
        }
    }
    label.map(|l| l.trim_end_matches('.').to_string())
}

/// Keep records whose observation interval overlaps the calendar day `date`
///
/// The window runs from 00:00:00 to 23:59:59.999999 inclusive. Records
/// without timestamps are dropped.
pub fn filter_day(records: Vec<PassiveRecord>, date: NaiveDate) -> Vec<PassiveRecord> {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = date
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .map(|end| end.and_utc())
        .unwrap_or(start);

    records
        .into_iter()
        .filter(|record| match (record.first_seen, record.last_seen) {
            (Some(first), Some(last)) => first <= end && last >= start,
            _ => false,
        })
        .collect()
}

/// DNSDB API client
pub struct DnsdbClient {
    client: Client,
    server: String,
    api_key: String,
}

impl DnsdbClient {
    pub fn new(client: Client, server: &str, api_key: &str) -> Self {
        Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Check that the service answers with data for a well-known name
    pub async fn is_available(&self) -> bool {
        let path = format!("lookup/rdata/name/{}", urlencoding::encode("google.com"));
        match self.query(&path).await {
            Ok(records) if !records.is_empty() => true,
            Ok(_) => {
                info!("Passive DNS check returned no data");
                false
            }
            Err(e) => {
                info!("Passive DNS check failed: {}", e);
                false
            }
        }
    }

    async fn query(&self, path: &str) -> Result<Vec<DnsdbRecord>, LookupError> {
        let url = format!("{}/{}", self.server, path);
        debug!("Passive DNS query: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        // DNSDB answers 404 when nothing was observed
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        parse_records(&body)
    }
}

#[async_trait]
impl PassiveDns for DnsdbClient {
    async fn by_address(&self, addr: IpAddr) -> Result<Vec<PassiveName>, LookupError> {
        let records = self.query(&format!("lookup/rdata/ip/{}", addr)).await?;
        Ok(records
            .into_iter()
            .map(|record| PassiveName {
                name: record.rrname,
                count: record.count,
            })
            .collect())
    }

    async fn rrset(&self, name: &str, rrtype: &str) -> Result<Vec<PassiveRecord>, LookupError> {
        let path = format!(
            "lookup/rrset/name/{}/{}",
            urlencoding::encode(name),
            urlencoding::encode(rrtype)
        );
        let records = self.query(&path).await?;
        Ok(records.into_iter().map(DnsdbRecord::into_record).collect())
    }
}

// DNSDB wire format: one JSON object per line
#[derive(Debug, Deserialize)]
struct DnsdbRecord {
    rrname: String,
    #[serde(default)]
    count: u64,
    #[serde(default)]
    rdata: RData,
    time_first: Option<i64>,
    time_last: Option<i64>,
    zone_time_first: Option<i64>,
    zone_time_last: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RData {
    One(String),
    Many(Vec<String>),
}

impl Default for RData {
    fn default() -> Self {
        RData::Many(Vec::new())
    }
}

impl DnsdbRecord {
    fn into_record(self) -> PassiveRecord {
        let first = self.time_first.or(self.zone_time_first);
        let last = self.time_last.or(self.zone_time_last);
        PassiveRecord {
            data: match self.rdata {
                RData::One(value) => vec![value],
                RData::Many(values) => values,
            },
            count: self.count,
            first_seen: first.and_then(|t| DateTime::from_timestamp(t, 0)),
            last_seen: last.and_then(|t| DateTime::from_timestamp(t, 0)),
        }
    }
}

fn parse_records(body: &str) -> Result<Vec<DnsdbRecord>, LookupError> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| LookupError::Parse(format!("passive DNS record: {}", e)))
        })
        .collect()
}

//! Enrichment results attached to indicators
//!
//! Enrichment is all-or-nothing: a result is either fully populated with
//! every sub-lookup that was attempted, or empty.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Indicator;

/// Network and DNS metadata gathered for one indicator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentData {
    /// Autonomous system number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_num: Option<u32>,
    /// Autonomous system organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_name: Option<String>,
    /// ISO country code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// First PTR answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Most observed name (or address) from passive DNS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive_hostname: Option<String>,
    /// Live A records
    #[serde(rename = "A", default, skip_serializing_if = "Vec::is_empty")]
    pub a: Vec<String>,
    /// Live MX exchanges
    #[serde(rename = "MX", default, skip_serializing_if = "Vec::is_empty")]
    pub mx: Vec<String>,
}

impl EnrichmentData {
    pub fn is_empty(&self) -> bool {
        *self == EnrichmentData::default()
    }
}

/// Why an enrichment attempt produced no data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    /// A sub-lookup failed; everything gathered so far was discarded
    Failed(String),
    /// No enrichment exists for this indicator type
    Unsupported,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::Failed(cause) => write!(f, "lookup failed: {}", cause),
            EmptyReason::Unsupported => f.write_str("no enrichment for this type"),
        }
    }
}

/// Outcome of one enrichment attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    Populated(EnrichmentData),
    Empty { reason: EmptyReason },
}

impl Enrichment {
    pub fn failed(cause: impl fmt::Display) -> Self {
        Enrichment::Empty {
            reason: EmptyReason::Failed(cause.to_string()),
        }
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, Enrichment::Populated(_))
    }

    /// The data to persist; empty results become an empty map
    pub fn into_data(self) -> EnrichmentData {
        match self {
            Enrichment::Populated(data) => data,
            Enrichment::Empty { .. } => EnrichmentData::default(),
        }
    }
}

/// An indicator paired with its (possibly empty) enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedIndicator {
    #[serde(flatten)]
    pub indicator: Indicator,
    #[serde(default)]
    pub enriched: EnrichmentData,
}

impl EnrichedIndicator {
    pub fn new(indicator: Indicator, enrichment: Enrichment) -> Self {
        Self {
            indicator,
            enriched: enrichment.into_data(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, IndicatorType};
    use chrono::NaiveDate;

    fn sample() -> Indicator {
        Indicator::new(
            "8.8.8.8",
            IndicatorType::Ipv4,
            Direction::Inbound,
            "feed",
            "http://feed",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        )
    }

    #[test]
    fn test_empty_enrichment_serializes_as_empty_map() {
        let enriched = EnrichedIndicator::new(sample(), Enrichment::failed("timeout"));
        let json = serde_json::to_value(&enriched).unwrap();
        assert_eq!(json["enriched"], serde_json::json!({}));
        assert_eq!(json["value"], "8.8.8.8");
    }

    #[test]
    fn test_populated_enrichment_keys() {
        let data = EnrichmentData {
            as_num: Some(15169),
            as_name: Some("Google LLC".to_string()),
            a: vec!["1.2.3.4".to_string()],
            ..Default::default()
        };
        let enriched = EnrichedIndicator::new(sample(), Enrichment::Populated(data));
        let json = serde_json::to_value(&enriched).unwrap();
        assert_eq!(json["enriched"]["as_num"], 15169);
        assert_eq!(json["enriched"]["A"][0], "1.2.3.4");
        assert!(json["enriched"].get("MX").is_none());
    }

    #[test]
    fn test_reads_back_enriched_record() {
        let json = r#"{"indicator": "evil.example", "indicator_type": "FQDN",
            "indicator_direction": "outbound", "source_name": "f", "source": "s",
            "date": "2024-01-02", "enriched": {"MX": ["mx.evil.example."]}}"#;
        let record: EnrichedIndicator = serde_json::from_str(json).unwrap();
        assert_eq!(record.indicator.indicator_type, IndicatorType::Fqdn);
        assert_eq!(record.enriched.mx, vec!["mx.evil.example.".to_string()]);
    }

    #[test]
    fn test_load_enriched_batch_skips_bad_records() {
        let json = r#"[
            {"value": "8.8.8.8", "type": "IPv4", "direction": "inbound",
             "source_name": "f", "source": "s", "date": "2024-01-02",
             "enriched": {"as_num": 15169, "country": "US"}},
            {"value": "1.1.1.1", "type": "IPv4", "direction": "inbound",
             "source_name": "f", "source": "s", "date": "2024-01-02",
             "enriched": {"as_num": "not a number"}},
            {"value": "d41d8cd98f00b204e9800998ecf8427e", "type": "HASH",
             "direction": "inbound", "source_name": "f", "source": "s",
             "date": "2024-01-02", "enriched": {}}
        ]"#;
        let records: Vec<EnrichedIndicator> = crate::load_records(json.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].enriched.country.as_deref(), Some("US"));
        assert!(records[1].enriched.is_empty());
    }
}

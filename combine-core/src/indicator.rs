//! Threat indicators as produced by feed plugins
//!
//! An indicator is a single datum (address, domain, hash or URL) tagged with
//! its declared type, traffic direction, source and observation date.
//! Indicators are never mutated once produced; the only derived form is a
//! reclassified copy when an address was tagged with the wrong family.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::{debug, warn};

use crate::CoreError;

/// Declared indicator type
///
/// Unknown tags are kept verbatim in [`IndicatorType::Other`] so they can be
/// reported when the classifier drops them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IndicatorType {
    /// IPv4 address
    Ipv4,
    /// IPv6 address
    Ipv6,
    /// Fully qualified domain name
    Fqdn,
    /// File hash
    Hash,
    /// URL
    Url,
    /// Anything a feed tagged with an unrecognized label
    Other(String),
}

impl IndicatorType {
    pub fn as_str(&self) -> &str {
        match self {
            IndicatorType::Ipv4 => "IPv4",
            IndicatorType::Ipv6 => "IPv6",
            IndicatorType::Fqdn => "FQDN",
            IndicatorType::Hash => "HASH",
            IndicatorType::Url => "URL",
            IndicatorType::Other(tag) => tag,
        }
    }
}

impl From<String> for IndicatorType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "IPv4" => IndicatorType::Ipv4,
            "IPv6" => IndicatorType::Ipv6,
            "FQDN" => IndicatorType::Fqdn,
            "HASH" => IndicatorType::Hash,
            "URL" => IndicatorType::Url,
            _ => IndicatorType::Other(tag),
        }
    }
}

impl From<&str> for IndicatorType {
    fn from(tag: &str) -> Self {
        IndicatorType::from(tag.to_string())
    }
}

impl From<IndicatorType> for String {
    fn from(kind: IndicatorType) -> Self {
        match kind {
            IndicatorType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traffic direction an indicator was observed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalized indicator
///
/// Field names follow the pipeline's JSON interchange format; the older
/// `indicator`, `indicator_type` and `indicator_direction` keys are accepted
/// on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    /// The indicator itself (address, domain, hash or URL)
    #[serde(rename = "value", alias = "indicator")]
    pub value: String,
    /// Declared type
    #[serde(rename = "type", alias = "indicator_type")]
    pub indicator_type: IndicatorType,
    /// Observed direction
    #[serde(rename = "direction", alias = "indicator_direction")]
    pub direction: Direction,
    /// Name of the feed that produced it
    pub source_name: String,
    /// URL the feed was fetched from
    pub source: String,
    /// Observation date
    pub date: NaiveDate,
    /// Free-form note carried through to outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Indicator {
    pub fn new(
        value: &str,
        indicator_type: IndicatorType,
        direction: Direction,
        source_name: &str,
        source: &str,
        date: NaiveDate,
    ) -> Self {
        Self {
            value: value.to_string(),
            indicator_type,
            direction,
            source_name: source_name.to_string(),
            source: source.to_string(),
            date,
            note: None,
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    /// Copy of this indicator carrying a corrected type
    pub fn reclassified(&self, indicator_type: IndicatorType) -> Self {
        Self {
            indicator_type,
            ..self.clone()
        }
    }
}

/// Syntactic form of an indicator value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressForm {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
    NotAnAddress,
}

/// Determine whether a value is an IPv4 literal, an IPv6 literal or neither
///
/// Surrounding whitespace is not stripped, so a padded literal is neither.
pub fn address_form(value: &str) -> AddressForm {
    if let Ok(v4) = value.parse::<Ipv4Addr>() {
        AddressForm::V4(v4)
    } else if let Ok(v6) = value.parse::<Ipv6Addr>() {
        AddressForm::V6(v6)
    } else {
        AddressForm::NotAnAddress
    }
}

/// Load an ordered JSON array of indicators
///
/// Each element is decoded on its own so a single malformed record is logged
/// and skipped instead of failing the whole batch. Input order is preserved.
pub fn load_indicators<R: Read>(reader: R) -> Result<Vec<Indicator>, CoreError> {
    load_records(reader)
}

/// Load an ordered JSON array of any record type, skipping malformed elements
pub fn load_records<T, R>(reader: R) -> Result<Vec<T>, CoreError>
where
    T: DeserializeOwned,
    R: Read,
{
    let raw: serde_json::Value = serde_json::from_reader(reader)?;
    let records = match raw {
        serde_json::Value::Array(records) => records,
        other => {
            return Err(CoreError::Parse(format!(
                "expected a JSON array of records, found {}",
                json_kind(&other)
            )))
        }
    };

    let total = records.len();
    let mut loaded = Vec::with_capacity(total);
    for (position, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<T>(record) {
            Ok(record) => loaded.push(record),
            Err(e) => warn!("Skipping malformed record #{}: {}", position, e),
        }
    }

    debug!("Loaded {} of {} records", loaded.len(), total);
    Ok(loaded)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags_round_trip_unknown() {
        assert_eq!(IndicatorType::from("FQDN"), IndicatorType::Fqdn);
        let other = IndicatorType::from("Subnet");
        assert_eq!(other, IndicatorType::Other("Subnet".to_string()));
        assert_eq!(String::from(other), "Subnet");
    }

    #[test]
    fn test_address_form() {
        assert!(matches!(address_form("8.8.8.8"), AddressForm::V4(_)));
        assert!(matches!(address_form("2001:db8::1"), AddressForm::V6(_)));
        assert_eq!(address_form("example.com"), AddressForm::NotAnAddress);
        assert_eq!(address_form("999.1.1.1"), AddressForm::NotAnAddress);
        assert_eq!(address_form(" 8.8.8.8 "), AddressForm::NotAnAddress);
        assert_eq!(address_form("2001:db8::1\n"), AddressForm::NotAnAddress);
    }

    #[test]
    fn test_load_accepts_both_key_styles() {
        let json = r#"[
            {"value": "8.8.8.8", "type": "IPv4", "direction": "inbound",
             "source_name": "feed-a", "source": "http://a", "date": "2024-03-01"},
            {"indicator": "evil.example", "indicator_type": "FQDN",
             "indicator_direction": "outbound", "source_name": "feed-b",
             "source": "http://b", "date": "2024-03-02", "note": "c2"}
        ]"#;

        let indicators = load_indicators(json.as_bytes()).unwrap();
        assert_eq!(indicators.len(), 2);
        assert_eq!(indicators[0].indicator_type, IndicatorType::Ipv4);
        assert_eq!(indicators[1].direction, Direction::Outbound);
        assert_eq!(indicators[1].note.as_deref(), Some("c2"));
    }

    #[test]
    fn test_load_skips_malformed_records() {
        let json = r#"[
            {"value": "1.2.3.4", "type": "IPv4", "direction": "inbound",
             "source_name": "a", "source": "s", "date": "2024-03-01"},
            {"value": "broken", "type": "IPv4"},
            {"value": "5.6.7.8", "type": "IPv4", "direction": "sideways",
             "source_name": "a", "source": "s", "date": "2024-03-01"},
            {"value": "9.9.9.9", "type": "IPv4", "direction": "outbound",
             "source_name": "a", "source": "s", "date": "2024-03-01"}
        ]"#;

        let indicators = load_indicators(json.as_bytes()).unwrap();
        let values: Vec<_> = indicators.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(values, vec!["1.2.3.4", "9.9.9.9"]);
    }

    #[test]
    fn test_load_rejects_non_array() {
        let result = load_indicators(r#"{"value": "x"}"#.as_bytes());
        assert!(matches!(result, Err(CoreError::Parse(_))));
    }

    #[test]
    fn test_serialize_uses_interchange_keys() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let indicator = Indicator::new("8.8.8.8", IndicatorType::Ipv4, Direction::Inbound, "a", "s", date);
        let json = serde_json::to_value(&indicator).unwrap();
        assert_eq!(json["type"], "IPv4");
        assert_eq!(json["direction"], "inbound");
        assert_eq!(json["date"], "2024-03-01");
        assert!(json.get("note").is_none());
    }
}

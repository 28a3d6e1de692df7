//! Indicator Classifier
//!
//! Decides, from the declared type and the value's syntax, whether an
//! indicator is kept and which enrichment (if any) applies to it.

use std::net::Ipv4Addr;

use combine_core::{address_form, is_reserved, AddressForm, Indicator, IndicatorType};
use combine_lookup::TldValidator;

use crate::EnrichmentToggles;

/// Enrichment an accepted indicator is eligible for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichKind {
    Ipv4(Ipv4Addr),
    Fqdn,
    Hash,
}

impl EnrichKind {
    pub fn enabled(&self, toggles: &EnrichmentToggles) -> bool {
        match self {
            EnrichKind::Ipv4(_) => toggles.ipv4,
            EnrichKind::Fqdn => toggles.fqdn,
            EnrichKind::Hash => toggles.hash,
        }
    }
}

/// Why an indicator was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Valid IPv4 inside reserved or private space
    Reserved(Ipv4Addr),
    /// Unknown type, or a value that failed its type's validation
    Unclassifiable,
}

/// Classifier verdict for one indicator
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Accepted {
        /// The indicator to keep, reclassified if its type was wrong
        indicator: Indicator,
        /// Enrichment it is eligible for
        enrich: Option<EnrichKind>,
    },
    Rejected(Rejection),
}

/// Classify one indicator
///
/// - IPv4 values are kept unless reserved and are eligible for enrichment
/// - IPv4/IPv6-tagged values that only parse as IPv6 are kept as IPv6
/// - Domains are kept if they end in a known TLD
/// - Hashes and URLs are always kept; only hashes are enrichment-eligible
pub fn classify(indicator: &Indicator, tld: &dyn TldValidator) -> Classification {
    let form = address_form(&indicator.value);

    match (&indicator.indicator_type, form) {
        (IndicatorType::Ipv4, AddressForm::V4(addr)) => {
            if is_reserved(addr) {
                Classification::Rejected(Rejection::Reserved(addr))
            } else {
                accepted(indicator.clone(), Some(EnrichKind::Ipv4(addr)))
            }
        }
        (IndicatorType::Ipv4 | IndicatorType::Ipv6, AddressForm::V6(_)) => {
            accepted(indicator.reclassified(IndicatorType::Ipv6), None)
        }
        (IndicatorType::Fqdn, _) if tld.is_valid_tld(&indicator.value) => {
            accepted(indicator.clone(), Some(EnrichKind::Fqdn))
        }
        (IndicatorType::Hash, _) => accepted(indicator.clone(), Some(EnrichKind::Hash)),
        (IndicatorType::Url, _) => accepted(indicator.clone(), None),
        _ => Classification::Rejected(Rejection::Unclassifiable),
    }
}

fn accepted(indicator: Indicator, enrich: Option<EnrichKind>) -> Classification {
    Classification::Accepted { indicator, enrich }
}

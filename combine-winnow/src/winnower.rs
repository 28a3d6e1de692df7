//! Winnowing run
//!
//! Classification runs sequentially over the crop. Enrichment attempts may
//! overlap (up to the context's concurrency) but results are collected in
//! input order, so both output streams look exactly as if every indicator
//! had been processed one after the other.

use futures::stream::{self, StreamExt};
use tracing::{error, info};

use combine_core::{EnrichedIndicator, Indicator};

use crate::{classify, Classification, Rejection, WinnowContext};

/// Result of a winnowing run
#[derive(Debug, Clone, Default)]
pub struct WinnowOutput {
    /// Accepted indicators, input order
    pub filtered: Vec<Indicator>,
    /// Accepted indicators that had an enrichment attempt, input order
    pub enriched: Vec<EnrichedIndicator>,
    /// Number of indicators dropped
    pub rejected: usize,
}

/// Classify and enrich indicators against a context
pub struct Winnower<'a> {
    context: &'a WinnowContext,
}

impl<'a> Winnower<'a> {
    pub fn new(context: &'a WinnowContext) -> Self {
        Self { context }
    }

    pub async fn run(&self, crop: &[Indicator]) -> WinnowOutput {
        let toggles = self.context.toggles();
        info!("Enriching IPv4 indicators: {}", flag(toggles.ipv4));
        info!("Enriching DNS indicators: {}", flag(toggles.fqdn));
        info!("Enriching Hash indicators: {}", flag(toggles.hash));
        info!("Passive DNS available: {}", flag(self.context.has_passive()));
        info!("Beginning winnowing process for {} indicators", crop.len());

        let mut filtered = Vec::with_capacity(crop.len());
        let mut pending = Vec::new();
        let mut rejected = 0;

        for each in crop {
            match classify(each, self.context.tld()) {
                Classification::Accepted { indicator, enrich } => {
                    if let Some(kind) = enrich.filter(|kind| kind.enabled(&toggles)) {
                        pending.push((indicator.clone(), kind));
                    }
                    filtered.push(indicator);
                }
                Classification::Rejected(Rejection::Reserved(addr)) => {
                    error!("Found invalid address: {} from: {}", addr, each.source);
                    rejected += 1;
                }
                Classification::Rejected(Rejection::Unclassifiable) => {
                    error!(
                        "Could not determine address type for {} listed as {}",
                        each.value, each.indicator_type
                    );
                    rejected += 1;
                }
            }
        }

        let resolver = self.context.resolver();
        let enriched: Vec<EnrichedIndicator> = stream::iter(pending)
            .map(move |(indicator, kind)| async move {
                let enrichment = resolver.enrich(&indicator, kind).await;
                EnrichedIndicator::new(indicator, enrichment)
            })
            .buffered(self.context.concurrency())
            .collect()
            .await;

        info!(
            "Winnowing complete: {} kept, {} enriched, {} rejected",
            filtered.len(),
            enriched.len(),
            rejected
        );

        WinnowOutput {
            filtered,
            enriched,
            rejected,
        }
    }
}

fn flag(enabled: bool) -> &'static str {
    if enabled {
        "TRUE"
    } else {
        "FALSE"
    }
}

//! Publish Dispatcher
//!
//! Republishes finalized indicators to a CRITs-style web API, one form POST
//! per indicator. A fixed pool of workers drains one shared queue:
//! - IPv4 goes to `{base}/ips/`, FQDN to `{base}/domains/`
//! - Everything else is consumed and skipped
//! - 200, 201 and 400 ("already exists") count as accepted
//! - Failures are logged and never retried or escalated

use parking_lot::Mutex;
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Instrument};

use combine_core::{BalerSettings, Indicator, IndicatorType, DEFAULT_CAMPAIGN, DEFAULT_MAX_THREADS};
use combine_lookup::{create_http_client, HttpConfig};

use crate::PublishError;

/// Source label used when an indicator carries no feed name
pub const DEFAULT_SOURCE: &str = "Combine";

/// Response codes treated as a successful submission
const ACCEPTED_STATUSES: [u16; 3] = [200, 201, 400];

/// Publishing target and credentials
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub username: String,
    pub api_key: String,
    pub base_url: String,
    pub campaign: String,
    pub confidence: String,
    pub max_threads: usize,
    pub verify_tls: bool,
}

impl PublishConfig {
    pub fn new(username: &str, api_key: &str, base_url: &str) -> Self {
        Self {
            username: username.to_string(),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            campaign: DEFAULT_CAMPAIGN.to_string(),
            confidence: "medium".to_string(),
            max_threads: DEFAULT_MAX_THREADS,
            verify_tls: false,
        }
    }

    /// Build from the `[baler]` settings
    ///
    /// Username, API key and URL are required; nothing is sent when one is
    /// missing.
    pub fn from_settings(settings: &BalerSettings) -> Result<Self, PublishError> {
        let username = required(&settings.crits_username, "crits_username")?;
        let api_key = required(&settings.crits_api_key, "crits_api_key")?;
        let base_url = required(&settings.crits_url, "crits_url")?;

        let mut config = Self::new(username, api_key, base_url)
            .with_confidence(&settings.crits_confidence)
            .with_verify_tls(settings.verify_tls);

        match settings.crits_campaign.as_deref() {
            Some(campaign) => config = config.with_campaign(campaign),
            None => info!(
                "Lacking a campaign name, defaulting to \"{}\"; it must exist on the platform",
                DEFAULT_CAMPAIGN
            ),
        }
        match settings.crits_max_threads {
            Some(threads) => config = config.with_max_threads(threads),
            None => info!("No worker count given, defaulting to {}", DEFAULT_MAX_THREADS),
        }

        Ok(config)
    }

    pub fn with_campaign(mut self, campaign: &str) -> Self {
        self.campaign = campaign.to_string();
        self
    }

    pub fn with_confidence(mut self, confidence: &str) -> Self {
        self.confidence = confidence.to_string();
        self
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads.max(1);
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Fields shared by every submission
    fn base_form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("add_indicator", "true".to_string()),
            ("confidence", self.confidence.clone()),
            ("username", self.username.clone()),
            ("api_key", self.api_key.clone()),
            ("campaign", self.campaign.clone()),
            ("method", "trawl".to_string()),
        ]
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn required<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, PublishError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(PublishError::MissingSetting(key))
}

/// Outcome of a publish run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Indicators placed on the queue
    pub submitted: usize,
    /// Submissions answered with an accepted status
    pub accepted: usize,
    /// Submissions rejected or lost in transport
    pub failed: usize,
    /// Indicators of a type with no endpoint
    pub skipped: usize,
    /// Workers used
    pub workers: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct Tally {
    accepted: usize,
    failed: usize,
    skipped: usize,
}

type WorkQueue = Arc<Mutex<VecDeque<Indicator>>>;

/// Concurrent publisher
pub struct Publisher {
    config: Arc<PublishConfig>,
    client: Client,
}

impl Publisher {
    pub fn new(config: PublishConfig) -> Result<Self, PublishError> {
        if !config.verify_tls {
            warn!("TLS certificate verification is disabled for publishing");
        }
        let client = create_http_client(&HttpConfig::default().with_verify_tls(config.verify_tls))?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Publish every indicator and wait until the queue is drained
    pub async fn publish(&self, indicators: Vec<Indicator>) -> PublishReport {
        let start = Instant::now();
        let submitted = indicators.len();
        let workers = self.config.max_threads.max(1);
        let queue: WorkQueue = Arc::new(Mutex::new(VecDeque::from(indicators)));

        info!("Publishing {} indicators with {} workers", submitted, workers);

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let queue = queue.clone();
                let client = self.client.clone();
                let config = self.config.clone();
                tokio::spawn(drain(id, queue, client, config).in_current_span())
            })
            .collect();

        let mut report = PublishReport {
            submitted,
            workers,
            ..PublishReport::default()
        };
        for handle in handles {
            match handle.await {
                Ok(tally) => {
                    report.accepted += tally.accepted;
                    report.failed += tally.failed;
                    report.skipped += tally.skipped;
                }
                Err(e) => error!("Publish worker died: {}", e),
            }
        }
        report.elapsed = start.elapsed();

        info!(
            "Output {} indicators to CRITs using {} workers in {:.2}s ({} accepted, {} failed, {} skipped)",
            report.submitted,
            report.workers,
            report.elapsed.as_secs_f64(),
            report.accepted,
            report.failed,
            report.skipped
        );
        report
    }
}

/// One worker: pop until the queue is empty
async fn drain(id: usize, queue: WorkQueue, client: Client, config: Arc<PublishConfig>) -> Tally {
    let mut tally = Tally::default();

    loop {
        let next = queue.lock().pop_front();
        let Some(indicator) = next else { break };

        let (path, fields) = match indicator.indicator_type {
            IndicatorType::Ipv4 => (
                "ips/",
                vec![
                    ("ip", indicator.value.clone()),
                    ("ip_type", "Address - ipv4-addr".to_string()),
                ],
            ),
            IndicatorType::Fqdn => ("domains/", vec![("domain", indicator.value.clone())]),
            _ => {
                info!(
                    "Don't yet know what to do with: {}[{}]",
                    indicator.indicator_type, indicator.value
                );
                tally.skipped += 1;
                continue;
            }
        };

        let source = if indicator.source_name.is_empty() {
            DEFAULT_SOURCE.to_string()
        } else {
            indicator.source_name.clone()
        };

        let mut form = config.base_form();
        form.extend(fields);
        form.push(("reference", indicator.source.clone()));
        form.push(("source", source));

        let url = config.endpoint(path);
        debug!("worker-{} POST {} for {}", id, url, indicator.value);

        match client.post(&url).form(&form).send().await {
            Ok(response) if ACCEPTED_STATUSES.contains(&response.status().as_u16()) => {
                tally.accepted += 1;
            }
            Ok(response) => {
                warn!(
                    "Issues with adding {}: HTTP {}",
                    indicator.value,
                    response.status()
                );
                tally.failed += 1;
            }
            Err(e) => {
                warn!("Issues with adding {}: {}", indicator.value, e);
                tally.failed += 1;
            }
        }
    }

    debug!("worker-{} finished", id);
    tally
}

//! Top-level domain validity
//!
//! Domains are checked offline against a cached copy of the IANA root zone
//! TLD list. The cache is downloaded only when it does not exist yet.

use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

use crate::LookupError;

/// IANA list of delegated top-level domains
pub const IANA_TLD_URL: &str = "https://data.iana.org/TLD/tlds-alpha-by-domain.txt";

static HOSTNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9_](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+(?:[a-z]{2,63}|xn--[a-z0-9-]{1,59})$")
        .unwrap()
});

/// Decides whether a domain ends in a real top-level domain
pub trait TldValidator: Send + Sync {
    fn is_valid_tld(&self, domain: &str) -> bool;
}

/// Set of known top-level domains
#[derive(Debug, Clone, Default)]
pub struct TldList {
    tlds: HashSet<String>,
}

impl TldList {
    /// Parse IANA format: one TLD per line, `#` starts a comment line
    pub fn parse(text: &str) -> Self {
        let tlds = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_lowercase)
            .collect();
        Self { tlds }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Download the list from `url` and store it at `path`
    pub async fn refresh(
        client: &Client,
        url: &str,
        path: impl AsRef<Path>,
    ) -> Result<Self, LookupError> {
        let path = path.as_ref();
        info!("Refreshing TLD list from {}", url);

        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }
        let text = response.text().await?;
        tokio::fs::write(path, &text).await?;

        let list = Self::parse(&text);
        info!("Stored {} TLDs in {}", list.len(), path.display());
        Ok(list)
    }

    /// Load the cached list, downloading it first if it is missing
    pub async fn load_or_refresh(
        client: &Client,
        path: impl AsRef<Path>,
    ) -> Result<Self, LookupError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            Self::refresh(client, IANA_TLD_URL, path).await
        }
    }

    pub fn len(&self) -> usize {
        self.tlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tlds.is_empty()
    }
}

impl TldValidator for TldList {
    fn is_valid_tld(&self, domain: &str) -> bool {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        if domain.len() > 253 || !HOSTNAME_REGEX.is_match(&domain) {
            return false;
        }
        domain
            .rsplit('.')
            .next()
            .is_some_and(|tld| self.tlds.contains(tld))
    }
}

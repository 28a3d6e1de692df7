//! Settings file
//!
//! One TOML file with a `[winnower]` and a `[baler]` table. Every key has a
//! default except the publishing credentials, which stay optional here and
//! are checked by the publisher before any request is made.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::CoreError;

/// Placeholder shipped in the example settings for the passive-DNS key
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Default campaign attached to published indicators
pub const DEFAULT_CAMPAIGN: &str = "combine";

/// Default publish worker count
pub const DEFAULT_MAX_THREADS: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub winnower: WinnowerSettings,
    pub baler: BalerSettings,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("could not read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(text: &str) -> Result<Self, CoreError> {
        toml::from_str(text).map_err(|e| CoreError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WinnowerSettings {
    /// Enrich accepted IPv4 indicators
    pub enrich_ip: bool,
    /// Enrich accepted domain indicators
    pub enrich_dns: bool,
    /// Enrich hash indicators
    pub enrich_hash: bool,
    /// Passive-DNS API endpoint
    pub dnsdb_server: String,
    /// Passive-DNS API key
    pub dnsdb_api: Option<String>,
    /// AS range source
    pub gi_org_loc: PathBuf,
    /// Country database
    pub gi_data_loc: PathBuf,
    /// Cached TLD list
    pub tld_list: PathBuf,
    /// Indicators enriched at once; 1 keeps the run strictly sequential
    pub enrich_concurrency: usize,
}

impl Default for WinnowerSettings {
    fn default() -> Self {
        Self {
            enrich_ip: false,
            enrich_dns: false,
            enrich_hash: false,
            dnsdb_server: "https://api.dnsdb.info".to_string(),
            dnsdb_api: None,
            gi_org_loc: PathBuf::from("data/GeoIPASNum2.csv"),
            gi_data_loc: PathBuf::from("data/GeoLite2-Country.mmdb"),
            tld_list: PathBuf::from("tld-list.txt"),
            enrich_concurrency: 1,
        }
    }
}

impl WinnowerSettings {
    /// The passive-DNS key, unless missing or left at the placeholder
    pub fn dnsdb_key(&self) -> Option<&str> {
        self.dnsdb_api
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BalerSettings {
    pub crits_username: Option<String>,
    pub crits_api_key: Option<String>,
    pub crits_url: Option<String>,
    pub crits_campaign: Option<String>,
    pub crits_max_threads: Option<usize>,
    pub crits_confidence: String,
    /// Verify the publishing platform's TLS certificate
    pub verify_tls: bool,
    /// Root of the tiq-test data tree
    pub tiq_directory: Option<PathBuf>,
}

impl Default for BalerSettings {
    fn default() -> Self {
        Self {
            crits_username: None,
            crits_api_key: None,
            crits_url: None,
            crits_campaign: None,
            crits_max_threads: None,
            crits_confidence: "medium".to_string(),
            verify_tls: false,
            tiq_directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_file() {
        let settings = Settings::from_toml("").unwrap();
        assert!(!settings.winnower.enrich_ip);
        assert_eq!(settings.winnower.enrich_concurrency, 1);
        assert_eq!(settings.baler.crits_confidence, "medium");
        assert!(!settings.baler.verify_tls);
        assert!(settings.baler.crits_url.is_none());
    }

    #[test]
    fn test_placeholder_key_is_absent() {
        let settings = Settings::from_toml(
            r#"
            [winnower]
            enrich_ip = true
            dnsdb_api = "YOUR_API_KEY_HERE"
            "#,
        )
        .unwrap();
        assert!(settings.winnower.enrich_ip);
        assert_eq!(settings.winnower.dnsdb_key(), None);

        let settings = Settings::from_toml("[winnower]\ndnsdb_api = \"abc\"\n").unwrap();
        assert_eq!(settings.winnower.dnsdb_key(), Some("abc"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[baler]\ncrits_url = \"https://crits.local/api/v1\"\ncrits_max_threads = 4").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.baler.crits_url.as_deref(), Some("https://crits.local/api/v1"));
        assert_eq!(settings.baler.crits_max_threads, Some(4));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Settings::load("/nonexistent/combine.toml");
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(Settings::from_toml("[winnower"), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_example_settings_parse() {
        let settings = Settings::from_toml(include_str!("../../combine-example.toml")).unwrap();
        assert_eq!(settings.winnower.dnsdb_key(), None);
        assert_eq!(settings.baler.crits_campaign.as_deref(), Some("combine"));
        assert_eq!(settings.baler.crits_max_threads, Some(10));
        assert_eq!(settings.baler.tiq_directory, Some(PathBuf::from("tiq-test")));
    }
}

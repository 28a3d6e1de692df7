//! HTTP client construction
//!
//! Shared by the passive-DNS client, the TLD list refresh and the publisher.

use reqwest::Client;
use std::time::Duration;

use crate::LookupError;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Verify server TLS certificates
    pub verify_tls: bool,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            verify_tls: true,
            user_agent: format!("combine/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }
}

/// Create an HTTP client
pub fn create_http_client(config: &HttpConfig) -> Result<Client, LookupError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.as_str())
        .danger_accept_invalid_certs(!config.verify_tls)
        .build()
        .map_err(|e| LookupError::ClientBuild(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert!(config.verify_tls);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.user_agent.starts_with("combine/"));
    }

    #[test]
    fn test_build_without_verification() {
        let config = HttpConfig::default().with_verify_tls(false);
        assert!(create_http_client(&config).is_ok());
    }
}

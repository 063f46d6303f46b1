// # HTTP IP Source
//
// This crate provides the public IP discovery for aliddns.
//
// ## Architecture
//
// Fetches the caller's public IP from a lookup service (e.g. api.ipify.org,
// icanhazip.com) that answers with the bare address as plain text. One
// request per cycle, no polling, no caching.
//
// With a secondary URL configured, `CrossCheckIpSource` asks both services
// and only trusts an address they agree on.

use aliddns_core::config::{IpSourceConfig, RecordType};
use aliddns_core::traits::IpSource;
use aliddns_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// HTTP-based IP source
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// Address family the record accepts
    family: RecordType,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    /// - `family`: Record type whose address family the answer must match
    /// - `timeout`: Whole-request timeout
    pub fn new(url: impl Into<String>, family: RecordType, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            family,
            client,
        })
    }

    /// The lookup URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch current IP from HTTP service
    async fn fetch_ip(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_source(format!(
                "{} returned HTTP {}",
                self.url,
                response.status()
            )));
        }

        let ip_text = response
            .text()
            .await
            .map_err(|e| {
                Error::ip_source(format!("Failed to read response from {}: {}", self.url, e))
            })?;

        let ip_text = ip_text.trim();
        if ip_text.is_empty() {
            return Err(Error::ip_source(format!("{} returned an empty body", self.url)));
        }

        // Parse IP address
        let ip: IpAddr = ip_text
            .parse()
            .map_err(|_| {
                Error::ip_source(format!("Invalid IP address from {}: {}", self.url, ip_text))
            })?;

        // Filter by the record's address family
        if !self.family.accepts(&ip) {
            let expected = match self.family {
                RecordType::A => "IPv4",
                RecordType::Aaaa => "IPv6",
            };
            return Err(Error::ip_source(format!(
                "Expected {} for a {} record, got: {}",
                expected, self.family, ip
            )));
        }

        tracing::debug!("{} reports {}", self.url, ip);
        Ok(ip)
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.fetch_ip().await
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Two lookup services that must agree
///
/// Queried one after the other. Any failure, or two different answers, is a
/// discovery failure.
pub struct CrossCheckIpSource {
    primary: HttpIpSource,
    secondary: HttpIpSource,
}

impl CrossCheckIpSource {
    pub fn new(primary: HttpIpSource, secondary: HttpIpSource) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait::async_trait]
impl IpSource for CrossCheckIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let first = self.primary.current().await?;
        let second = self.secondary.current().await?;

        if first != second {
            tracing::warn!(
                "Lookup services disagree: {} says {}, {} says {}",
                self.primary.url(),
                first,
                self.secondary.url(),
                second
            );
            return Err(Error::ip_source(format!(
                "Lookup services disagree ({} vs {})",
                first, second
            )));
        }

        Ok(first)
    }

    fn describe(&self) -> String {
        format!("{} + {}", self.primary.url(), self.secondary.url())
    }
}

/// Build the IP source described by the configuration
pub fn from_config(config: &IpSourceConfig, family: RecordType) -> Result<Box<dyn IpSource>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let primary = HttpIpSource::new(config.url.as_str(), family, timeout)?;

    match config.secondary_url {
        Some(ref secondary) => {
            let secondary = HttpIpSource::new(secondary.as_str(), family, timeout)?;
            Ok(Box::new(CrossCheckIpSource::new(primary, secondary)))
        }
        None => Ok(Box::new(primary)),
    }
}

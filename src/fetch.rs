//! Outbound HTTP
//!
//! The initial target fetch is strict: any failure aborts the scan. Every
//! other request goes through [`Fetcher::probe`] or [`Fetcher::probe_any`],
//! which turn failures into `None`.

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use tracing::debug;
use url::Url;

/// Allowed URL schemes
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// A fetched response
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body, decoded as text
    pub body: String,
}

impl Page {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client with a fixed identifying user agent
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    allow_private: bool,
}

impl Fetcher {
    /// Build a fetcher from scan settings
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .danger_accept_invalid_certs(false)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            allow_private: config.allow_private,
        })
    }

    /// Parse and vet a user-supplied target URL.
    ///
    /// Requires an absolute http(s) URL with a host. Unless private targets
    /// are allowed, rejects localhost and hosts resolving to internal
    /// addresses (SSRF protection).
    pub async fn validate_target(&self, raw: &str) -> Result<Url> {
        let url = parse_target(raw)?;

        if !self.allow_private {
            Self::validate_host(&url).await?;
        }

        Ok(url)
    }

    /// Validate that the host is not an internal/private address
    async fn validate_host(url: &Url) -> Result<()> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl("missing host".to_string()))?;

        if host == "localhost" || host.ends_with(".localhost") {
            return Err(Error::InvalidUrl("localhost not allowed".to_string()));
        }

        // IP literals need no lookup
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Self::check_ip(ip);
        }

        let port = url.port_or_known_default().unwrap_or(443);
        if let Ok(addrs) = tokio::net::lookup_host((host, port)).await {
            for addr in addrs {
                Self::check_ip(addr.ip())?;
            }
        }

        Ok(())
    }

    fn check_ip(ip: IpAddr) -> Result<()> {
        if is_internal_ip(ip) {
            return Err(Error::InvalidUrl(format!(
                "internal/private IP address not allowed: {}",
                ip
            )));
        }
        Ok(())
    }

    /// Fetch a URL and return the response whatever its status
    pub async fn fetch(&self, url: &Url) -> Result<Page> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| Error::HttpRequest(e.to_string()))?;

        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| Error::HttpRequest(e.to_string()))?;

        Ok(Page {
            url: final_url,
            status,
            headers,
            body,
        })
    }

    /// Fetch a URL, treating non-2xx as an error
    pub async fn fetch_ok(&self, url: &Url) -> Result<Page> {
        let page = self.fetch(url).await?;
        if !page.is_success() {
            return Err(Error::HttpStatus(page.status));
        }
        Ok(page)
    }

    /// Best-effort fetch: `None` on network failure or non-2xx
    pub async fn probe(&self, url: &Url) -> Option<Page> {
        match self.fetch_ok(url).await {
            Ok(page) => Some(page),
            Err(e) => {
                debug!(url = %url, error = %e, "probe yielded no evidence");
                None
            }
        }
    }

    /// Best-effort fetch that keeps error pages; `None` only on network failure
    pub async fn probe_any(&self, url: &Url) -> Option<Page> {
        match self.fetch(url).await {
            Ok(page) => Some(page),
            Err(e) => {
                debug!(url = %url, error = %e, "probe failed");
                None
            }
        }
    }

    /// Best-effort JSON GET: `None` on network failure, non-2xx or bad JSON
    pub async fn probe_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(url, error = %e, "JSON probe failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(url, status = response.status().as_u16(), "JSON probe rejected");
            return None;
        }

        match response.json().await {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(url, error = %e, "JSON probe returned unexpected body");
                None
            }
        }
    }
}

/// Parse a target URL without touching the network
pub fn parse_target(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(Error::InvalidUrl(format!(
            "scheme '{}' not allowed (use http or https)",
            url.scheme()
        )));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidUrl("missing host".to_string()));
    }

    Ok(url)
}

/// Check if an IP address is internal/private (RFC 1918, link-local, loopback, etc.)
fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_loopback()                      // 127.0.0.0/8
                || ipv4.is_private()                // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
                || ipv4.is_link_local()             // 169.254.0.0/16, incl. cloud metadata
                || ipv4.is_broadcast()              // 255.255.255.255
                || ipv4.is_unspecified()            // 0.0.0.0
                || ipv4.octets()[0] == 100          // Shared address space 100.64.0.0/10
                    && (64..=127).contains(&ipv4.octets()[1])
                || ipv4.octets()[..3] == [192, 0, 2] // TEST-NET-1
        }
        IpAddr::V6(ipv6) => {
            ipv6.is_loopback()                      // ::1
                || ipv6.is_unspecified()            // ::
                || (ipv6.segments()[0] & 0xfe00) == 0xfc00  // fc00::/7
                || (ipv6.segments()[0] & 0xffc0) == 0xfe80  // fe80::/10
                || ipv6.to_ipv4_mapped().is_some_and(|v4| is_internal_ip(IpAddr::V4(v4)))
        }
    }
}

//! URL validation: scheme allow/block lists, length caps, and an SSRF guard
//! for IP-literal hosts. Hostnames are never resolved (no DNS lookups).

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::{Error, Result};

const BLOCKED_SCHEMES: &[&str] = &["javascript", "data", "file", "vbscript", "about", "blob"];
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Validation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum accepted URL length in bytes
    #[serde(default = "default_max_url_length")]
    pub max_url_length: usize,
    /// Maximum number of URLs per batch request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Allow URLs whose host is a private/reserved IP literal
    #[serde(default)]
    pub allow_private_ips: bool,
}

fn default_max_url_length() -> usize {
    2048
}

fn default_max_batch_size() -> usize {
    5000
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_url_length: default_max_url_length(),
            max_batch_size: default_max_batch_size(),
            allow_private_ips: false,
        }
    }
}

/// Validates URLs before they are shortened.
pub struct UrlValidator {
    config: ValidationConfig,
}

impl UrlValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn validate_url(&self, raw: &str) -> Result<()> {
        if raw.trim().is_empty() {
            return Err(Error::EmptyUrl);
        }

        if raw.len() > self.config.max_url_length {
            return Err(Error::UrlTooLong);
        }

        let parsed = Url::parse(raw).map_err(|_| Error::InvalidUrlFormat)?;

        let scheme = parsed.scheme().to_ascii_lowercase();
        if BLOCKED_SCHEMES.contains(&scheme.as_str()) {
            return Err(Error::UnsafeProtocol);
        }
        if !ALLOWED_SCHEMES.contains(&scheme.as_str()) {
            return Err(Error::InvalidUrlFormat);
        }

        let host = parsed.host().ok_or(Error::InvalidUrlFormat)?;

        if !self.config.allow_private_ips {
            validate_host(&host)?;
        }

        Ok(())
    }

    pub fn validate_batch(&self, urls: &[String]) -> Result<()> {
        if urls.is_empty() {
            return Err(Error::EmptyBatch);
        }

        if urls.len() > self.config.max_batch_size {
            return Err(Error::BatchTooLarge);
        }

        let mut errors = Vec::new();
        for (i, u) in urls.iter().enumerate() {
            if let Err(e) = self.validate_url(u) {
                errors.push((i, Box::new(e)));
            }
        }

        if !errors.is_empty() {
            return Err(Error::BatchValidation(errors));
        }

        Ok(())
    }
}

fn validate_host(host: &Host<&str>) -> Result<()> {
    match host {
        // Domain names are accepted as-is; resolution happens at redirect
        // time in the visitor's browser, not in this service.
        Host::Domain(_) => Ok(()),
        Host::Ipv4(addr) => validate_ipv4(*addr),
        Host::Ipv6(addr) => {
            if let Some(v4) = addr.to_ipv4_mapped() {
                return validate_ipv4(v4);
            }
            if addr.is_loopback()
                || addr.is_multicast()
                || addr.is_unspecified()
                || addr.is_unicast_link_local()
                || addr.is_unique_local()
            {
                return Err(Error::PrivateIpNotAllowed);
            }
            Ok(())
        }
    }
}

fn validate_ipv4(addr: Ipv4Addr) -> Result<()> {
    if addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_multicast()
        || addr.is_broadcast()
        || addr.is_unspecified()
        || is_reserved_range(addr)
    {
        return Err(Error::PrivateIpNotAllowed);
    }
    Ok(())
}

/// Reserved IPv4 ranges not covered by the std predicates.
fn is_reserved_range(addr: Ipv4Addr) -> bool {
    let [a, b, c, _] = addr.octets();

    // 100.64.0.0/10 (Carrier-grade NAT)
    if a == 100 && (64..=127).contains(&b) {
        return true;
    }

    // 192.0.0.0/24 (IETF Protocol Assignments) and 192.0.2.0/24 (TEST-NET-1)
    if a == 192 && b == 0 && (c == 0 || c == 2) {
        return true;
    }

    // 198.51.100.0/24 (TEST-NET-2)
    if a == 198 && b == 51 && c == 100 {
        return true;
    }

    // 203.0.113.0/24 (TEST-NET-3)
    if a == 203 && b == 0 && c == 113 {
        return true;
    }

    false
}

//! URL validation for caller-supplied callback targets
//!
//! A job may name a `submit` URL that receives its result. Since the worker
//! posts to it from inside the deployment network, the URL must:
//! - Use the http or https scheme
//! - Name a host
//! - Not resolve to a private/internal address (unless explicitly allowed)

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use thiserror::Error;
use tracing::warn;
use url::{Host, Url};

/// Errors that can occur during URL validation
#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be http or https, got: {0}")]
    UnsupportedScheme(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL resolves to private/internal IP address: {0}")]
    PrivateIpDetected(IpAddr),

    #[error("Failed to resolve hostname: {0}")]
    DnsResolutionFailed(String),
}

/// Checks if an IPv4 address is private/internal
///
/// Covers loopback, RFC 1918, link-local, broadcast, unspecified,
/// documentation, CGNAT (100.64.0.0/10) and benchmarking (198.18.0.0/15).
pub fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    if ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
    {
        return true;
    }
    let octets = ip.octets();
    // CGNAT
    if octets[0] == 100 && (octets[1] & 0xC0) == 64 {
        return true;
    }
    octets[0] == 198 && (octets[1] == 18 || octets[1] == 19)
}

/// Checks if an IPv6 address is private/internal
///
/// Covers loopback, unspecified, link-local (fe80::/10), unique local
/// (fc00::/7), documentation (2001:db8::/32) and IPv4-mapped private addresses.
pub fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let segments = ip.segments();
    if segments[0] & 0xFFC0 == 0xFE80 || segments[0] & 0xFE00 == 0xFC00 {
        return true;
    }
    if segments[0] == 0x2001 && segments[1] == 0x0DB8 {
        return true;
    }
    ip.to_ipv4_mapped()
        .map(|ipv4| is_private_ipv4(&ipv4))
        .unwrap_or(false)
}

/// Checks if an IP address is private/internal
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => is_private_ipv6(ipv6),
    }
}

/// A callback URL that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackTarget {
    pub url: Url,
    /// Addresses the host resolved to during validation. Requests must be
    /// sent to these instead of resolving the host again. Empty for IP
    /// literals and when private targets are allowed.
    pub resolved: Vec<SocketAddr>,
}

/// Validates a callback URL and returns it parsed.
///
/// With `allow_private` set only the scheme and host checks apply. Otherwise
/// raw IP hosts are checked directly and domain names are resolved; any
/// private address among the results rejects the URL.
///
/// # Example
/// ```rust,ignore
/// use lipsync_worker::utils::url_validation::validate_callback_url;
///
/// assert!(validate_callback_url("https://hooks.example.com/done", false).await.is_ok());
/// assert!(validate_callback_url("http://localhost/done", false).await.is_err());
/// assert!(validate_callback_url("http://localhost/done", true).await.is_ok());
/// ```
pub async fn validate_callback_url(
    url: &str,
    allow_private: bool,
) -> Result<Url, UrlValidationError> {
    resolve_callback_target(url, allow_private)
        .await
        .map(|target| target.url)
}

/// Validates a callback URL and keeps the addresses it was checked against.
pub async fn resolve_callback_target(
    url: &str,
    allow_private: bool,
) -> Result<CallbackTarget, UrlValidationError> {
    let parsed = Url::parse(url)?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme(
            parsed.scheme().to_string(),
        ));
    }

    let host = parsed.host().ok_or(UrlValidationError::MissingHost)?;
    if allow_private {
        return Ok(CallbackTarget {
            url: parsed,
            resolved: Vec::new(),
        });
    }

    let ip = match host {
        Host::Ipv4(ip) => Some(IpAddr::V4(ip)),
        Host::Ipv6(ip) => Some(IpAddr::V6(ip)),
        Host::Domain(_) => None,
    };
    if let Some(ip) = ip {
        if is_private_ip(&ip) {
            warn!(url = %parsed, "Callback URL targets a private address");
            return Err(UrlValidationError::PrivateIpDetected(ip));
        }
        return Ok(CallbackTarget {
            url: parsed,
            resolved: Vec::new(),
        });
    }

    let domain = parsed
        .host_str()
        .ok_or(UrlValidationError::MissingHost)?
        .to_string();
    let port = parsed.port_or_known_default().unwrap_or(443);
    let addrs: Vec<_> = tokio::net::lookup_host((domain.as_str(), port))
        .await
        .map_err(|e| UrlValidationError::DnsResolutionFailed(format!("{domain}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(UrlValidationError::DnsResolutionFailed(format!(
            "{domain}: no addresses"
        )));
    }

    if let Some(addr) = addrs.iter().find(|addr| is_private_ip(&addr.ip())) {
        warn!(
            url = %parsed,
            resolved_ip = %addr.ip(),
            "Callback URL resolves to a private address"
        );
        return Err(UrlValidationError::PrivateIpDetected(addr.ip()));
    }

    Ok(CallbackTarget {
        url: parsed,
        resolved: addrs,
    })
}

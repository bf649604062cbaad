//! Target validation for page fetches: URL shape, scheme, and the
//! private-host guard (literal addresses plus a DNS pre-check).

use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use tracing::warn;
use url::{Host, Url};

use super::FetchError;

const DNS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves a host to addresses. Tests substitute fixed answers.
pub(crate) trait DnsResolver {
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, FetchError>;
}

pub(crate) struct TokioDnsResolver;

impl DnsResolver for TokioDnsResolver {
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, FetchError> {
        let addrs = tokio::time::timeout(
            DNS_LOOKUP_TIMEOUT,
            tokio::net::lookup_host(format!("{host}:{port}")),
        )
        .await
        .map_err(|_| FetchError::DnsResolution("DNS lookup timed out".to_string()))?
        .map_err(|e| FetchError::DnsResolution(e.to_string()))?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

/// Strips `user:password@` before a URL reaches the logs.
pub(crate) fn redact_url(raw: &str) -> Cow<'_, str> {
    if !raw.contains('@') {
        return Cow::Borrowed(raw);
    }
    if let Ok(mut parsed) = Url::parse(raw)
        && (!parsed.username().is_empty() || parsed.password().is_some())
    {
        let _ = parsed.set_username("");
        let _ = parsed.set_password(None);
        return Cow::Owned(parsed.to_string());
    }
    Cow::Borrowed(raw)
}

/// Parses `raw` and requires an http(s) scheme.
pub(super) fn parse_target(raw: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(raw).map_err(|_| FetchError::InvalidUrl(redact_url(raw).into_owned()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::InvalidScheme),
    }
}

/// Rejects targets on loopback/private networks, including domains that
/// resolve there. TOCTOU: reqwest resolves again when connecting.
pub(super) async fn reject_private_host(
    target: &Url,
    resolver: &impl DnsResolver,
) -> Result<(), FetchError> {
    if is_blocked_host(target) {
        warn!(url = %redact_url(target.as_str()), "blocked fetch to internal/private host");
        return Err(FetchError::InternalHost);
    }

    if let Some(Host::Domain(domain)) = target.host() {
        let port = target.port_or_known_default().unwrap_or(80);
        for ip in resolver.lookup(domain, port).await? {
            if is_private_ip(ip) {
                warn!(host = %domain, ip = %ip, "DNS resolves to private IP");
                return Err(FetchError::InternalHost);
            }
        }
    }

    Ok(())
}

fn is_blocked_host(target: &Url) -> bool {
    match target.host() {
        Some(Host::Ipv4(v4)) => is_private_ip(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_ip(IpAddr::V6(v6)),
        Some(Host::Domain(domain)) => {
            let lower = domain.to_ascii_lowercase();
            lower == "localhost"
                || [".localhost", ".local", ".internal", ".arpa"]
                    .iter()
                    .any(|suffix| lower.ends_with(suffix))
        }
        None => true,
    }
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || is_v6_prefix(&v6, 0xffc0, 0xfe80)
                || is_v6_prefix(&v6, 0xfe00, 0xfc00)
                || v6.to_ipv4_mapped().is_some_and(is_private_v4)
        }
    }
}

fn is_private_v4(v4: Ipv4Addr) -> bool {
    let [a, b, ..] = v4.octets();
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_unspecified()
        || v4.is_broadcast()
        || a == 0
        // carrier-grade NAT, 100.64.0.0/10
        || (a == 100 && (64..=127).contains(&b))
}

/// Link-local is fe80::/10, unique-local fc00::/7.
fn is_v6_prefix(v6: &Ipv6Addr, mask: u16, prefix: u16) -> bool {
    (v6.segments()[0] & mask) == prefix
}

//! Hostname resolution behind a trait so tests can substitute their own.
//!
//! The production resolver goes through `tokio::net::lookup_host`, which is
//! backed by getaddrinfo — the same path the HTTP client and browser use to
//! connect. Validating through a different resolver than the one the
//! connection will use would let a split-horizon name defeat the guard.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net;

use crate::guard::error::GuardError;

/// Default bound on a single forward lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Turns a hostname into every address it denotes.
///
/// Implementations must return all addresses, not just the first: the
/// connection may pick any of them, so validating a subset is a bypass.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, hostname: &str) -> Result<Vec<IpAddr>, GuardError>;
}

/// Resolve a hostname, treating IP literal text as identity (no DNS).
///
/// Accepts both bare literals ("10.0.0.5", "::1") and the bracketed IPv6
/// form URLs carry ("[::1]").
pub async fn resolve_addresses(
    resolver: &dyn Resolver,
    hostname: &str,
) -> Result<Vec<IpAddr>, GuardError> {
    if let Some(literal) = parse_ip_literal(hostname) {
        return Ok(vec![literal]);
    }
    resolver.resolve(hostname).await
}

/// Parse hostname text as an IP literal, if it is one.
pub fn parse_ip_literal(hostname: &str) -> Option<IpAddr> {
    if let Ok(ip) = hostname.parse::<IpAddr>() {
        return Some(ip);
    }
    hostname
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|inner| inner.parse::<IpAddr>().ok())
}

/// The system resolver: getaddrinfo via tokio, bounded by a timeout.
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_TIMEOUT)
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, hostname: &str) -> Result<Vec<IpAddr>, GuardError> {
        let lookup = net::lookup_host((hostname, 0u16));
        let addrs = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| {
                GuardError::resolution_failed(
                    hostname,
                    format!("lookup timed out after {}ms", self.timeout.as_millis()),
                )
            })?
            .map_err(|e| GuardError::resolution_failed(hostname, e.to_string()))?;

        let ips = dedupe(addrs.map(|sock| sock.ip()));
        if ips.is_empty() {
            return Err(GuardError::resolution_failed(
                hostname,
                "no addresses returned",
            ));
        }
        Ok(ips)
    }
}

/// A resolver that pins configured hostnames to fixed addresses and defers
/// everything else to an inner resolver.
///
/// Backs the `dns_overrides` config table. Override values are kept as the
/// raw text from the config file and parsed at resolve time, so a typo
/// surfaces as a blocked decision rather than a startup failure.
pub struct OverlayResolver {
    overrides: HashMap<String, Vec<String>>,
    inner: Arc<dyn Resolver>,
}

impl OverlayResolver {
    pub fn new(overrides: HashMap<String, Vec<String>>, inner: Arc<dyn Resolver>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(host, addrs)| (host.to_ascii_lowercase(), addrs))
            .collect();
        Self { overrides, inner }
    }
}

#[async_trait]
impl Resolver for OverlayResolver {
    async fn resolve(&self, hostname: &str) -> Result<Vec<IpAddr>, GuardError> {
        let key = hostname.to_ascii_lowercase();
        let Some(entries) = self.overrides.get(&key) else {
            return self.inner.resolve(hostname).await;
        };

        let mut ips = Vec::with_capacity(entries.len());
        for text in entries {
            let ip = text
                .parse::<IpAddr>()
                .map_err(|_| GuardError::invalid_resolved(hostname, text))?;
            if !ips.contains(&ip) {
                ips.push(ip);
            }
        }
        if ips.is_empty() {
            return Err(GuardError::resolution_failed(
                hostname,
                "override entry lists no addresses",
            ));
        }
        Ok(ips)
    }
}

fn dedupe(addrs: impl Iterator<Item = IpAddr>) -> Vec<IpAddr> {
    let mut out = Vec::new();
    for ip in addrs {
        if !out.contains(&ip) {
            out.push(ip);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverResolver;

    #[async_trait]
    impl Resolver for NeverResolver {
        async fn resolve(&self, hostname: &str) -> Result<Vec<IpAddr>, GuardError> {
            panic!("resolver must not be consulted for {hostname}");
        }
    }

    #[tokio::test]
    async fn test_literal_text_is_identity() {
        let ips = resolve_addresses(&NeverResolver, "10.0.0.5").await.unwrap();
        assert_eq!(ips, vec!["10.0.0.5".parse::<IpAddr>().unwrap()]);

        let ips = resolve_addresses(&NeverResolver, "[::1]").await.unwrap();
        assert_eq!(ips, vec!["::1".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_overlay_pins_configured_hosts() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "Pinned.Example".to_string(),
            vec!["93.184.216.34".to_string(), "93.184.216.34".to_string()],
        );
        let overlay = OverlayResolver::new(overrides, Arc::new(NeverResolver));

        let ips = overlay.resolve("pinned.example").await.unwrap();
        assert_eq!(ips, vec!["93.184.216.34".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_overlay_rejects_unparseable_override_text() {
        let mut overrides = HashMap::new();
        overrides.insert("bad.example".to_string(), vec!["not-an-ip".to_string()]);
        let overlay = OverlayResolver::new(overrides, Arc::new(NeverResolver));

        let err = overlay.resolve("bad.example").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_resolved_address");
        assert!(err.to_string().contains("not-an-ip"));
    }

    #[test]
    fn test_parse_ip_literal_rejects_names() {
        assert!(parse_ip_literal("example.com").is_none());
        assert!(parse_ip_literal("10.0.0").is_none());
        assert!(parse_ip_literal("[not-v6]").is_none());
    }
}

//! Per-session memoization of host decisions.
//!
//! One cache per analysis session, shared across the navigation check and
//! every concurrent subresource check, then torn down with the session.
//! Never a process-wide singleton: concurrent sessions must not see each
//! other's decisions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::guard::host::{HostDecision, HostValidator};

/// Hostname -> decision map with at-most-one resolution per hostname.
///
/// Concurrent callers for different hostnames proceed independently; callers
/// for the same hostname collapse onto one in-flight resolution via a
/// per-key once-cell. The map lock is held only to fetch or insert the
/// cell, never across the resolution itself.
pub struct SessionHostCache {
    validator: HostValidator,
    entries: Mutex<HashMap<String, Arc<OnceCell<HostDecision>>>>,
}

impl SessionHostCache {
    pub fn new(validator: HostValidator) -> Self {
        Self {
            validator,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the session's decision for this hostname, validating it on
    /// first use. Hostnames are compared case-insensitively.
    pub async fn get_or_validate(&self, hostname: &str) -> HostDecision {
        let key = hostname.trim().to_ascii_lowercase();

        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(key.clone()).or_default().clone()
        };

        if let Some(decision) = cell.get() {
            debug!(hostname = %key, %decision, "host decision from cache");
            return decision.clone();
        }

        cell.get_or_init(|| self.validator.validate_host(&key))
            .await
            .clone()
    }

    /// Number of hostnames decided so far this session.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::error::GuardError;
    use crate::guard::resolver::Resolver;
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl CountingResolver {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Resolver for CountingResolver {
        async fn resolve(&self, hostname: &str) -> Result<Vec<IpAddr>, GuardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Let concurrent callers pile up behind the first resolution.
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            match hostname {
                "example.com" => Ok(vec!["93.184.216.34".parse().unwrap()]),
                "localhost" => Ok(vec!["127.0.0.1".parse().unwrap()]),
                other => Err(GuardError::resolution_failed(other, "NXDOMAIN")),
            }
        }
    }

    fn cache_with(resolver: Arc<CountingResolver>) -> SessionHostCache {
        SessionHostCache::new(HostValidator::new(resolver))
    }

    #[tokio::test]
    async fn test_repeated_lookups_resolve_at_most_once() {
        let resolver = CountingResolver::new();
        let cache = cache_with(resolver.clone());

        let first = cache.get_or_validate("example.com").await;
        let second = cache.get_or_validate("example.com").await;

        assert!(first.is_allowed());
        assert_eq!(first, second);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hostname_keys_are_case_insensitive() {
        let resolver = CountingResolver::new();
        let cache = cache_with(resolver.clone());

        cache.get_or_validate("Example.COM").await;
        cache.get_or_validate("example.com").await;

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_same_host_collapses_to_one_resolution() {
        let resolver = CountingResolver::new();
        let cache = Arc::new(cache_with(resolver.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_validate("example.com").await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_allowed());
        }

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_hosts_get_independent_decisions() {
        let resolver = CountingResolver::new();
        let cache = cache_with(resolver.clone());

        let allowed = cache.get_or_validate("example.com").await;
        let blocked = cache.get_or_validate("localhost").await;

        assert!(allowed.is_allowed());
        assert!(blocked.is_blocked());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_blocked_decisions_are_cached_too() {
        let resolver = CountingResolver::new();
        let cache = cache_with(resolver.clone());

        let first = cache.get_or_validate("gone.example").await;
        let second = cache.get_or_validate("gone.example").await;

        assert!(first.is_blocked());
        assert_eq!(first, second);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }
}

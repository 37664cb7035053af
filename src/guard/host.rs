//! Hostname validation: resolve, classify, decide.

use std::sync::Arc;

use globset::{Glob, GlobMatcher};
use std::fmt;
use tracing::debug;

use crate::guard::classify::{classify, AddressClass};
use crate::guard::error::GuardError;
use crate::guard::resolver::{resolve_addresses, Resolver};

/// The outcome of checking one hostname. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostDecision {
    Allowed,
    Blocked(GuardError),
}

impl HostDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, HostDecision::Allowed)
    }

    pub fn is_blocked(&self) -> bool {
        !self.is_allowed()
    }

    /// The reason, when blocked.
    pub fn block_reason(&self) -> Option<&GuardError> {
        match self {
            HostDecision::Allowed => None,
            HostDecision::Blocked(reason) => Some(reason),
        }
    }

    /// Convert into a `Result`, for callers that propagate with `?`.
    pub fn into_result(self) -> Result<(), GuardError> {
        match self {
            HostDecision::Allowed => Ok(()),
            HostDecision::Blocked(reason) => Err(reason),
        }
    }
}

impl fmt::Display for HostDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostDecision::Allowed => write!(f, "allowed"),
            HostDecision::Blocked(reason) => write!(f, "blocked: {reason}"),
        }
    }
}

/// Pre-compiled hostname deny patterns, checked before any DNS traffic.
/// Compiled once at config load, reused for every check.
#[derive(Debug, Clone, Default)]
pub struct HostDenyList {
    patterns: Vec<(String, GlobMatcher)>,
}

impl HostDenyList {
    /// Compile a list of glob pattern strings (e.g. `*.internal`).
    pub fn new(patterns: &[String]) -> Result<Self, globset::Error> {
        let compiled = patterns
            .iter()
            .map(|p| {
                let glob = Glob::new(p)?;
                Ok((p.clone(), glob.compile_matcher()))
            })
            .collect::<Result<Vec<_>, globset::Error>>()?;
        Ok(Self { patterns: compiled })
    }

    /// The first pattern the hostname matches, if any.
    pub fn matched_pattern(&self, hostname: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, matcher)| matcher.is_match(hostname))
            .map(|(text, _)| text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Decides whether a hostname is safe to connect to, right now.
///
/// Point-in-time check: a name may re-resolve differently later. That gap is
/// accepted and narrowed by the per-session cache, not by socket-layer
/// re-checks (out of scope for this guard).
pub struct HostValidator {
    resolver: Arc<dyn Resolver>,
    deny_list: HostDenyList,
}

impl HostValidator {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            deny_list: HostDenyList::default(),
        }
    }

    pub fn with_deny_list(mut self, deny_list: HostDenyList) -> Self {
        self.deny_list = deny_list;
        self
    }

    /// Validate one hostname: every resolved address must be public.
    ///
    /// Any single non-public address blocks the entire hostname; the reason
    /// names the first offender found (no ordering guarantee across several
    /// bad addresses — any one suffices).
    pub async fn validate_host(&self, hostname: &str) -> HostDecision {
        let hostname = hostname.trim();
        if hostname.is_empty() {
            return HostDecision::Blocked(GuardError::MissingHostname);
        }

        if let Some(pattern) = self.deny_list.matched_pattern(hostname) {
            return HostDecision::Blocked(GuardError::host_denied(hostname, pattern));
        }

        let addresses = match resolve_addresses(self.resolver.as_ref(), hostname).await {
            Ok(addresses) => addresses,
            Err(reason) => return HostDecision::Blocked(reason),
        };

        for address in addresses {
            let class = classify(address);
            if class != AddressClass::Public {
                debug!(%hostname, %address, %class, "non-public address");
                return HostDecision::Blocked(GuardError::blocked_address(hostname, address));
            }
        }

        HostDecision::Allowed
    }
}

//! The reason vocabulary for every way a request can be refused.
//!
//! Validation failures, resolver failures and transport failures all surface
//! as a [`GuardError`] so callers have one failure model regardless of where
//! the failure originated. Causes are carried as strings so decisions stay
//! cheap to clone into the session cache and the decision log.

use std::net::IpAddr;
use thiserror::Error;

/// Why a URL, hostname or redirect hop was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// URL scheme is something other than http or https.
    #[error("Invalid URL scheme: {scheme}")]
    InvalidScheme { scheme: String },

    /// URL has no hostname component.
    #[error("Invalid URL: missing hostname")]
    MissingHostname,

    /// URL could not be parsed at all.
    #[error("Invalid URL: {reason}")]
    InvalidUrl { reason: String },

    /// The hostname (or one of its resolved addresses) is not globally routable.
    #[error("{}", blocked_text(.hostname, .address))]
    BlockedAddress { hostname: String, address: IpAddr },

    /// Forward DNS lookup failed (NXDOMAIN, timeout, resolver error).
    #[error("DNS resolution failed for {hostname}: {cause}")]
    ResolutionFailed { hostname: String, cause: String },

    /// The resolver produced address text that does not parse as an IP.
    #[error("Invalid resolved IP for {hostname}: {address}")]
    InvalidResolvedAddress { hostname: String, address: String },

    /// The hostname matched a configured deny pattern (checked before DNS).
    #[error("Blocked hostname {hostname}: matches deny pattern {pattern}")]
    HostDenied { hostname: String, pattern: String },

    /// A redirect response carried no Location header.
    #[error("Redirect response missing Location header")]
    RedirectMissingLocation,

    /// The redirect budget was exhausted before a non-redirect response.
    #[error("Too many redirects (max {max})")]
    TooManyRedirects { max: usize },

    /// A redirect hop targeted a URL that failed validation.
    #[error("Blocked redirect target (hop {hop}): {reason}")]
    BlockedRedirect { hop: usize, reason: Box<GuardError> },

    /// The URL a request finally landed on failed re-validation.
    #[error("Blocked final URL: {reason}")]
    BlockedFinalUrl { reason: Box<GuardError> },

    /// The request or navigation did not complete within its time budget.
    #[error("Timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// TLS handshake or certificate failure from the transport.
    #[error("SSL error: {cause}")]
    Tls { cause: String },

    /// The transport could not connect at all.
    #[error("Connection error: {cause}")]
    Connection { cause: String },

    /// Any other transport-level failure.
    #[error("Request failed: {cause}")]
    Transport { cause: String },
}

fn blocked_text(hostname: &str, address: &IpAddr) -> String {
    // An IP literal given as the hostname names itself; skip the redundant form.
    if hostname == address.to_string() {
        format!("Blocked non-public IP: {hostname}")
    } else {
        format!("Blocked non-public IP for {hostname}: {address}")
    }
}

impl GuardError {
    pub(crate) fn invalid_scheme(scheme: impl Into<String>) -> Self {
        Self::InvalidScheme {
            scheme: scheme.into(),
        }
    }

    pub(crate) fn invalid_url(reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            reason: reason.into(),
        }
    }

    pub(crate) fn blocked_address(hostname: impl Into<String>, address: IpAddr) -> Self {
        Self::BlockedAddress {
            hostname: hostname.into(),
            address,
        }
    }

    pub(crate) fn resolution_failed(hostname: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::ResolutionFailed {
            hostname: hostname.into(),
            cause: cause.into(),
        }
    }

    pub(crate) fn invalid_resolved(hostname: impl Into<String>, address: impl Into<String>) -> Self {
        Self::InvalidResolvedAddress {
            hostname: hostname.into(),
            address: address.into(),
        }
    }

    pub(crate) fn host_denied(hostname: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::HostDenied {
            hostname: hostname.into(),
            pattern: pattern.into(),
        }
    }

    pub(crate) fn blocked_redirect(hop: usize, reason: GuardError) -> Self {
        Self::BlockedRedirect {
            hop,
            reason: Box::new(reason),
        }
    }

    pub(crate) fn blocked_final_url(reason: GuardError) -> Self {
        Self::BlockedFinalUrl {
            reason: Box::new(reason),
        }
    }

    /// The short machine-readable kind tag used in decision records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidScheme { .. } => "invalid_scheme",
            Self::MissingHostname => "missing_hostname",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::BlockedAddress { .. } => "blocked_address",
            Self::ResolutionFailed { .. } => "resolution_failed",
            Self::InvalidResolvedAddress { .. } => "invalid_resolved_address",
            Self::HostDenied { .. } => "host_denied",
            Self::RedirectMissingLocation => "redirect_missing_location",
            Self::TooManyRedirects { .. } => "too_many_redirects",
            Self::BlockedRedirect { .. } => "blocked_redirect",
            Self::BlockedFinalUrl { .. } => "blocked_final_url",
            Self::Timeout { .. } => "timeout",
            Self::Tls { .. } => "tls",
            Self::Connection { .. } => "connection",
            Self::Transport { .. } => "transport",
        }
    }
}

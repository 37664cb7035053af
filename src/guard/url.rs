//! URL validation: the front door of the guard.
//!
//! `validate_url` normalizes a raw string, enforces the scheme whitelist,
//! and runs the hostname through the session's host cache. Success yields a
//! [`ValidatedUrl`], which cannot be constructed any other way. Code that
//! accepts a `ValidatedUrl` can rely on the checks having happened.

use std::fmt;

use url::{Host, Url};

use crate::guard::cache::SessionHostCache;
use crate::guard::error::GuardError;

/// A URL that has passed scheme and host validation for one session.
///
/// The inner [`Url`] is parsed and normalized, so the usual accessors are
/// available without re-parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    url: Url,
}

impl ValidatedUrl {
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Hostname in the form the validator saw it: domains lowercased,
    /// IPv6 literals without brackets.
    pub fn hostname(&self) -> String {
        // Validation guarantees a host is present.
        hostname_of(&self.url).unwrap_or_default()
    }

    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    pub fn into_url(self) -> Url {
        self.url
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Validate a raw URL string against one session's host cache.
///
/// Normalization before any check: surrounding whitespace is trimmed, and a
/// bare `host/path` input gets an `https://` prefix. Only `http` and `https`
/// pass the scheme whitelist. The parser normalizes an absent path to `/`.
pub async fn validate_url(
    raw: &str,
    cache: &SessionHostCache,
) -> Result<ValidatedUrl, GuardError> {
    let url = parse_with_default_scheme(raw.trim())?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(GuardError::invalid_scheme(scheme));
    }

    let hostname = match hostname_of(&url) {
        Some(host) => host,
        None => return Err(GuardError::MissingHostname),
    };

    cache.get_or_validate(&hostname).await.into_result()?;

    Ok(ValidatedUrl { url })
}

/// Extract the hostname as text: domains as-is (the parser lowercases
/// them), IP literals in canonical form, IPv6 without brackets.
pub(crate) fn hostname_of(url: &Url) -> Option<String> {
    match url.host() {
        Some(Host::Domain(domain)) => Some(domain.to_string()),
        Some(Host::Ipv4(addr)) => Some(addr.to_string()),
        Some(Host::Ipv6(addr)) => Some(addr.to_string()),
        None => None,
    }
}

fn parse_with_default_scheme(trimmed: &str) -> Result<Url, GuardError> {
    match Url::parse(trimmed) {
        Ok(url) => Ok(url),
        // "example.com/path" has no scheme; retry with the https default.
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{trimmed}")).map_err(map_parse_error)
        }
        Err(err) => Err(map_parse_error(err)),
    }
}

fn map_parse_error(err: url::ParseError) -> GuardError {
    match err {
        url::ParseError::EmptyHost => GuardError::MissingHostname,
        other => GuardError::invalid_url(other.to_string()),
    }
}

//! Guarded HTTP fetching.
//!
//! The client never follows redirects on its own. Each hop comes back to
//! this loop, where the target is validated like a fresh navigation before
//! the next request goes out. An open redirect on an allowed site therefore
//! cannot bounce a fetch into private address space.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, LOCATION};
use reqwest::redirect;
use tracing::debug;

use crate::audit::CheckPhase;
use crate::config::ScanConfig;
use crate::fetch::response::FinalResponse;
use crate::guard::GuardError;
use crate::session::Session;

/// Statuses treated as redirects. 300 and 304 are terminal responses.
const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

fn is_redirect_status(status: u16) -> bool {
    REDIRECT_STATUSES.contains(&status)
}

/// HTTP client wrapper that fetches one page at a time through the guard.
pub struct PageFetcher {
    client: reqwest::Client,
    follow_redirects: bool,
}

impl PageFetcher {
    /// Build a client from config: browser-like headers, request timeout,
    /// no automatic redirects, and the config's DNS pins applied so
    /// connections go where validation looked.
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        // Accept-Encoding is negotiated by the client so bodies decompress.

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .timeout(config.fetch_timeout());

        for (hostname, addrs) in &config.dns_overrides {
            let sockets: Vec<SocketAddr> = addrs
                .iter()
                .filter_map(|a| a.parse().ok())
                .map(|ip| SocketAddr::new(ip, 0))
                .collect();
            if !sockets.is_empty() {
                builder = builder.resolve_to_addrs(hostname, &sockets);
            }
        }

        Ok(Self {
            client: builder.build().context("Failed to build HTTP client")?,
            follow_redirects: true,
        })
    }

    /// Build a fetcher around a pre-built client. Tests use this to point
    /// hostnames at a local listener.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            follow_redirects: true,
        }
    }

    /// Whether redirects are followed at all (`fetch --no-redirects`
    /// turns this off; the first response is then terminal).
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Fetch a URL, validating the navigation target, every redirect hop,
    /// and the URL the request finally landed on.
    pub async fn fetch(
        &self,
        session: &Session,
        raw_url: &str,
    ) -> Result<FinalResponse, GuardError> {
        let max_redirects = session.config().max_redirects;
        let timeout_ms = session.config().timeout_secs * 1000;

        let mut current = session
            .validate_url(raw_url, CheckPhase::Navigation)
            .await?;
        let mut redirect_chain: Vec<String> = Vec::new();

        for _ in 0..=max_redirects {
            let response = self
                .client
                .get(current.as_str())
                .send()
                .await
                .map_err(|e| map_transport_error(e, timeout_ms))?;

            let status = response.status().as_u16();
            if !self.follow_redirects || !is_redirect_status(status) {
                return self.finish(session, response, redirect_chain, timeout_ms).await;
            }

            let hop = redirect_chain.len() + 1;
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            let location = match location {
                Some(l) => l,
                None => return Err(GuardError::RedirectMissingLocation),
            };

            // Location may be relative; resolve against the hop we are on.
            let next = current
                .as_url()
                .join(&location)
                .map_err(|e| {
                    GuardError::blocked_redirect(hop, GuardError::invalid_url(e.to_string()))
                })?;

            let next = session
                .validate_url(next.as_str(), CheckPhase::Redirect)
                .await
                .map_err(|reason| GuardError::blocked_redirect(hop, reason))?;

            debug!(hop, status, from = %current, to = %next, "following redirect");
            redirect_chain.push(next.as_str().to_string());
            current = next;
        }

        Err(GuardError::TooManyRedirects { max: max_redirects })
    }

    async fn finish(
        &self,
        session: &Session,
        response: reqwest::Response,
        redirect_chain: Vec<String>,
        timeout_ms: u64,
    ) -> Result<FinalResponse, GuardError> {
        // With no automatic redirects this URL was validated moments ago,
        // but the client may still rewrite it (IDN mapping, middleware).
        // Re-run the full pipeline; cached hosts make it cheap.
        let final_url = response.url().clone();
        if let Err(reason) = session
            .validate_url(final_url.as_str(), CheckPhase::FinalUrl)
            .await
        {
            return Err(GuardError::blocked_final_url(reason));
        }

        let status_code = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let content = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, timeout_ms))?;

        Ok(FinalResponse {
            url: final_url.to_string(),
            status_code,
            headers,
            content,
            redirect_chain,
        })
    }
}

/// Lowercased header map; repeated headers join with ", ".
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let text = String::from_utf8_lossy(value.as_bytes()).to_string();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&text);
            })
            .or_insert(text);
    }
    map
}

/// Sort a transport failure into the guard's taxonomy.
fn map_transport_error(err: reqwest::Error, timeout_ms: u64) -> GuardError {
    if err.is_timeout() {
        return GuardError::Timeout {
            after_ms: timeout_ms,
        };
    }
    if tls_in_chain(&err) {
        return GuardError::Tls {
            cause: err.to_string(),
        };
    }
    if err.is_connect() {
        return GuardError::Connection {
            cause: err.to_string(),
        };
    }
    GuardError::Transport {
        cause: err.to_string(),
    }
}

/// TLS failures surface as opaque hyper errors. Walk the source chain and
/// look for the usual wording.
fn tls_in_chain(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        let text = e.to_string().to_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("handshake") {
            return true;
        }
        current = e.source();
    }
    false
}

//! Per-request policy for driven pages.
//!
//! Every request a rendered page tries to make (documents, scripts, images,
//! XHR, anything) is routed through [`RequestGate::on_request`] before the
//! driver lets it onto the network. Inert schemes that never leave the
//! browser pass untouched; everything else is allowed only when its host
//! resolves entirely to public addresses. Unknown schemes and unparseable
//! URLs are blocked, not waved through.

use std::sync::Arc;

use tracing::warn;
use url::Url;

use crate::audit::CheckPhase;
use crate::guard::url::hostname_of;
use crate::guard::{GuardError, HostDecision};
use crate::session::Session;

/// Schemes that resolve inside the browser without touching the network.
const INERT_SCHEMES: [&str; 3] = ["data", "blob", "about"];

/// The gate's answer for one page request.
#[derive(Debug)]
pub enum GateDecision {
    Allow,
    Block(GuardError),
}

impl GateDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }

    pub fn block_reason(&self) -> Option<&GuardError> {
        match self {
            GateDecision::Allow => None,
            GateDecision::Block(reason) => Some(reason),
        }
    }
}

/// Decides, for each request a page makes, whether it may reach the
/// network. Shares the session's host cache, so a host checked during
/// fetch or navigation is not resolved again here.
pub struct RequestGate {
    session: Arc<Session>,
}

impl RequestGate {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Rule on one URL the page wants to request.
    pub async fn on_request(&self, raw_url: &str) -> GateDecision {
        let parsed = match Url::parse(raw_url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return self
                    .block(raw_url, None, GuardError::invalid_url(e.to_string()))
                    .await;
            }
        };

        let scheme = parsed.scheme();
        if INERT_SCHEMES.contains(&scheme) {
            // Never touches the network; nothing to check or record.
            return GateDecision::Allow;
        }

        if scheme != "http" && scheme != "https" {
            return self
                .block(raw_url, None, GuardError::invalid_scheme(scheme))
                .await;
        }

        let hostname = match hostname_of(&parsed) {
            Some(hostname) => hostname,
            None => {
                return self.block(raw_url, None, GuardError::MissingHostname).await;
            }
        };

        match self.session.cache().get_or_validate(&hostname).await {
            HostDecision::Allowed => {
                self.session
                    .record_allowed(CheckPhase::Subresource, raw_url, Some(hostname))
                    .await;
                GateDecision::Allow
            }
            HostDecision::Blocked(reason) => self.block(raw_url, Some(hostname), reason).await,
        }
    }

    /// Re-check the URL a navigation actually landed on. The load itself
    /// went through [`on_request`], but the page can end up somewhere the
    /// per-request view never saw (javascript pushState, driver error
    /// pages), so the landed URL gets one more full check before any
    /// content is read off the page.
    pub async fn revalidate_final_url(&self, page_url: &str) -> Result<(), GuardError> {
        let parsed = Url::parse(page_url)
            .map_err(|e| GuardError::blocked_final_url(GuardError::invalid_url(e.to_string())));
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(err) => return self.deny_final(page_url, None, err).await,
        };

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            let err = GuardError::blocked_final_url(GuardError::invalid_scheme(scheme));
            return self.deny_final(page_url, None, err).await;
        }

        let hostname = match hostname_of(&parsed) {
            Some(hostname) => hostname,
            None => {
                let err = GuardError::blocked_final_url(GuardError::MissingHostname);
                return self.deny_final(page_url, None, err).await;
            }
        };

        match self.session.cache().get_or_validate(&hostname).await {
            HostDecision::Allowed => {
                self.session
                    .record_allowed(CheckPhase::FinalUrl, page_url, Some(hostname))
                    .await;
                Ok(())
            }
            HostDecision::Blocked(reason) => {
                let err = GuardError::blocked_final_url(reason);
                self.deny_final(page_url, Some(hostname), err).await
            }
        }
    }

    async fn block(
        &self,
        raw_url: &str,
        hostname: Option<String>,
        reason: GuardError,
    ) -> GateDecision {
        warn!(url = raw_url, %reason, "blocked page request");
        self.session
            .record_blocked(CheckPhase::Subresource, raw_url, hostname, &reason)
            .await;
        GateDecision::Block(reason)
    }

    async fn deny_final(
        &self,
        page_url: &str,
        hostname: Option<String>,
        err: GuardError,
    ) -> Result<(), GuardError> {
        warn!(url = page_url, reason = %err, "blocked final page URL");
        self.session
            .record_blocked(CheckPhase::FinalUrl, page_url, hostname, &err)
            .await;
        Err(err)
    }
}

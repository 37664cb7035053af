//! A scan session: one command invocation's guard state.
//!
//! The session owns the host cache, the compiled deny list, the resolver
//! (with any config overrides layered on), and the decision logger. Every
//! URL check a command makes goes through here, so the per-session
//! invariants hold: one resolution per hostname, every decision recorded.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audit::{CheckPhase, DecisionLogger, DecisionRecord};
use crate::config::ScanConfig;
use crate::guard::{
    self, GuardError, HostDenyList, HostValidator, OverlayResolver, Resolver, SessionHostCache,
    SystemResolver, ValidatedUrl,
};

pub struct Session {
    id: String,
    command: String,
    config: Arc<ScanConfig>,
    cache: SessionHostCache,
    logger: Option<Arc<Mutex<DecisionLogger>>>,
    log_path: Option<PathBuf>,
}

impl Session {
    /// Build a session from config: system resolver with the config's DNS
    /// overrides layered on, compiled deny list, fresh cache, fresh id.
    pub fn new(command: &str, config: ScanConfig) -> Result<Self> {
        let resolver = build_resolver(&config);
        Self::with_resolver(command, config, resolver)
    }

    /// Build a session around a specific resolver. Tests use this to pin
    /// hostnames without touching real DNS.
    pub fn with_resolver(
        command: &str,
        config: ScanConfig,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self> {
        let deny_list =
            HostDenyList::new(&config.deny_hosts).context("Invalid deny_hosts pattern")?;
        let validator = HostValidator::new(resolver).with_deny_list(deny_list);

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            command: command.to_string(),
            config: Arc::new(config),
            cache: SessionHostCache::new(validator),
            logger: None,
            log_path: None,
        })
    }

    /// Attach a decision logger. The CLI does; library callers usually
    /// leave logging off.
    pub fn with_logger(mut self, logger: DecisionLogger) -> Self {
        self.log_path = Some(logger.log_path().to_path_buf());
        self.logger = Some(Arc::new(Mutex::new(logger)));
        self
    }

    /// Attach a logger in the config's log directory (or the default,
    /// ~/.pagewarden/logs), named after this session.
    pub fn with_decision_log(self) -> Result<Self> {
        let logger = match &self.config.log_dir {
            Some(dir) => DecisionLogger::in_dir(dir, &self.id)?,
            None => DecisionLogger::new(&self.id)?,
        };
        Ok(self.with_logger(logger))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn cache(&self) -> &SessionHostCache {
        &self.cache
    }

    /// Where this session's decisions are being written, if logging is on.
    pub fn log_path(&self) -> Option<&PathBuf> {
        self.log_path.as_ref()
    }

    /// Validate a URL through the session cache and record the decision.
    pub async fn validate_url(
        &self,
        raw: &str,
        phase: CheckPhase,
    ) -> Result<ValidatedUrl, GuardError> {
        let result = guard::validate_url(raw, &self.cache).await;
        match &result {
            Ok(validated) => {
                debug!(%phase, url = validated.as_str(), "allowed");
                self.record_allowed(phase, validated.as_str(), Some(validated.hostname()))
                    .await;
            }
            Err(error) => {
                debug!(%phase, url = raw.trim(), %error, "blocked");
                self.record_blocked(phase, raw.trim(), hostname_hint(raw), error)
                    .await;
            }
        }
        result
    }

    /// Record an allowed URL without re-validating (gate callers decide
    /// first, then record).
    pub async fn record_allowed(&self, phase: CheckPhase, url: &str, hostname: Option<String>) {
        self.write_record(DecisionRecord::allowed(
            &self.id,
            &self.command,
            phase,
            url,
            hostname,
        ))
        .await;
    }

    /// Record a blocked URL.
    pub async fn record_blocked(
        &self,
        phase: CheckPhase,
        url: &str,
        hostname: Option<String>,
        error: &GuardError,
    ) {
        self.write_record(DecisionRecord::blocked(
            &self.id,
            &self.command,
            phase,
            url,
            hostname,
            error,
        ))
        .await;
    }

    async fn write_record(&self, record: DecisionRecord) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.lock().await.log(&record) {
                warn!("Failed to write decision record: {:#}", e);
            }
        }
    }
}

/// System resolver, with the config's overrides layered on when present.
fn build_resolver(config: &ScanConfig) -> Arc<dyn Resolver> {
    let system = Arc::new(SystemResolver::default());
    if config.dns_overrides.is_empty() {
        system
    } else {
        Arc::new(OverlayResolver::new(
            config.dns_overrides.clone(),
            system,
        ))
    }
}

/// Best-effort hostname for log records of URLs that failed validation.
fn hostname_hint(raw: &str) -> Option<String> {
    url::Url::parse(raw.trim())
        .ok()
        .and_then(|url| crate::guard::url::hostname_of(&url))
}

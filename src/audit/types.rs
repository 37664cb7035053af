//! Types for the decision log.
//!
//! Every URL the guard rules on gets a record: the navigation itself, each
//! subresource the page requested, each redirect hop, and the final-URL
//! re-check. The log answers "what did this scan touch, and what did the
//! guard stop" after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::guard::GuardError;

/// Where in the request lifecycle a URL was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckPhase {
    /// The URL handed to the command.
    Navigation,
    /// A request the rendered page made (image, script, beacon).
    Subresource,
    /// A redirect hop target during a plain fetch.
    Redirect,
    /// The URL the page actually landed on, after navigation finished.
    FinalUrl,
}

impl fmt::Display for CheckPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckPhase::Navigation => write!(f, "navigation"),
            CheckPhase::Subresource => write!(f, "subresource"),
            CheckPhase::Redirect => write!(f, "redirect"),
            CheckPhase::FinalUrl => write!(f, "final_url"),
        }
    }
}

impl CheckPhase {
    /// Parse a phase from a CLI filter string.
    pub fn from_str_loose(s: &str) -> Option<CheckPhase> {
        match s.to_lowercase().trim() {
            "navigation" | "nav" => Some(CheckPhase::Navigation),
            "subresource" | "sub" | "request" => Some(CheckPhase::Subresource),
            "redirect" | "hop" => Some(CheckPhase::Redirect),
            "final_url" | "final-url" | "final" => Some(CheckPhase::FinalUrl),
            _ => None,
        }
    }
}

/// What the guard decided about one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// URL passed every check and the request went ahead.
    Allowed,
    /// URL was stopped before any connection was made.
    Blocked {
        /// Why it was blocked, in the guard's words.
        reason: String,
        /// Stable error kind tag for filtering ("blocked_address", ...).
        kind: String,
    },
}

impl Outcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Outcome::Allowed)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Outcome::Blocked { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Allowed => write!(f, "allowed"),
            Outcome::Blocked { reason, .. } => write!(f, "blocked: {}", reason),
        }
    }
}

/// A single entry in the decision log. One record per checked URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// When the check happened.
    pub timestamp: DateTime<Utc>,

    /// Session identifier (UUID, generated when the command starts).
    pub session_id: String,

    /// Which command was running ("fetch", "audit", "visual", "shot", "check").
    pub command: String,

    /// Where in the lifecycle the URL came up.
    pub phase: CheckPhase,

    /// The URL that was checked.
    pub url: String,

    /// Hostname extracted from the URL, when one was present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// What the guard decided. Flattened so each JSONL line stays flat:
    /// `"outcome": "blocked"` with `reason` and `kind` beside it.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl DecisionRecord {
    pub fn allowed(
        session_id: impl Into<String>,
        command: impl Into<String>,
        phase: CheckPhase,
        url: impl Into<String>,
        hostname: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id.into(),
            command: command.into(),
            phase,
            url: url.into(),
            hostname,
            outcome: Outcome::Allowed,
        }
    }

    pub fn blocked(
        session_id: impl Into<String>,
        command: impl Into<String>,
        phase: CheckPhase,
        url: impl Into<String>,
        hostname: Option<String>,
        error: &GuardError,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id.into(),
            command: command.into(),
            phase,
            url: url.into(),
            hostname,
            outcome: Outcome::Blocked {
                reason: error.to_string(),
                kind: error.kind().to_string(),
            },
        }
    }
}

/// Summary statistics for one session's decision log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub command: String,
    pub total_checks: usize,
    pub allowed: usize,
    pub blocked: usize,
    pub unique_hosts: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SessionSummary {
    /// One-liner for terminal output.
    pub fn one_line(&self) -> String {
        format!(
            "{} checks | {} allowed | {} blocked | {} hosts",
            self.total_checks, self.allowed, self.blocked, self.unique_hosts
        )
    }
}

/// Filter criteria for querying decision logs.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub session_id: Option<String>,
    pub phase: Option<CheckPhase>,
    pub outcome: Option<OutcomeFilter>,
    pub limit: Option<usize>,
}

/// Outcome filter for log queries.
#[derive(Debug, Clone)]
pub enum OutcomeFilter {
    Allowed,
    Blocked,
}

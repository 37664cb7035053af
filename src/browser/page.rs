//! The page surface the analysis tools program against.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::{Viewport, WaitUntil};

/// A failure inside the browser engine or its driver, as opposed to a
/// policy decision (those are `GuardError`s).
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The page did not finish loading within the navigation deadline.
    #[error("Page load timed out after {after_ms}ms")]
    NavigationTimeout { after_ms: u64 },

    /// A driver command got no reply in time.
    #[error("Driver command timed out after {after_ms}ms")]
    CommandTimeout { after_ms: u64 },

    /// The driver executable could not be started.
    #[error("Failed to launch browser driver '{command}': {cause}")]
    Launch { command: String, cause: String },

    /// The driver reported a failure, or went away mid-command.
    #[error("Browser driver error: {0}")]
    Driver(String),

    /// The driver answered with something the protocol does not allow.
    #[error("Driver protocol error: {0}")]
    Protocol(String),
}

/// A snapshot of one matched element: geometry and content, no live handle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Top edge in page coordinates. None when the element renders no box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,

    /// Inner text, trimmed.
    #[serde(default)]
    pub text: String,

    /// Attributes present on the element.
    #[serde(default)]
    pub attrs: HashMap<String, String>,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Whether the element's top edge sits above the given fold line.
    /// Elements without a box (display:none) are never above the fold.
    pub fn above_fold(&self, fold: f64) -> bool {
        self.top.map_or(false, |top| top < fold)
    }
}

/// An open page in the driven browser.
///
/// Implemented by [`DriverPage`](crate::browser::DriverPage) for real runs;
/// tests substitute scripted implementations.
#[async_trait]
pub trait Page: Send + Sync {
    /// Set the viewport for the next navigation. The driver recreates its
    /// browsing context, so cookies and page state do not carry over.
    async fn set_viewport(&self, viewport: Viewport) -> Result<(), EngineError>;

    /// Navigate to `url` and wait for the given readiness state.
    async fn navigate(
        &self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    /// The URL the page currently sits at (after any redirects).
    async fn current_url(&self) -> Result<String, EngineError>;

    /// The document title.
    async fn title(&self) -> Result<String, EngineError>;

    /// Evaluate a JavaScript expression in the page and return its value
    /// as JSON. Expressions resolving to undefined come back as null.
    async fn eval(&self, js: &str) -> Result<Value, EngineError>;

    /// First element matching the CSS selector, if any.
    async fn query(&self, selector: &str) -> Result<Option<ElementInfo>, EngineError>;

    /// All elements matching the CSS selector.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementInfo>, EngineError>;

    /// Capture a screenshot into `path` (PNG, written by the driver).
    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), EngineError>;

    /// Let the page sit for `duration` (lazy loaders, animations).
    async fn settle(&self, duration: Duration) -> Result<(), EngineError>;

    /// Close the page and shut the driver down.
    async fn close(&self) -> Result<(), EngineError>;
}

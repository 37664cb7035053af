//! Screenshot capture across viewports.
//!
//! One driver serves every requested viewport; each capture sets the
//! viewport, navigates fresh, re-validates where the page landed, lets
//! the page settle, then writes the PNG. A failed viewport records its
//! error and the loop moves on to the next one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::audit::CheckPhase;
use crate::browser::{DriverPage, EngineError, Page, RequestGate};
use crate::config::{Viewport, ViewportKind};
use crate::guard::{GuardError, ValidatedUrl};
use crate::session::Session;

/// How long a loaded page gets to finish lazy images and animations
/// before the shutter.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct ShotOptions {
    pub viewports: Vec<ViewportKind>,
    pub output_dir: PathBuf,
    pub full_page: bool,
    pub settle: Duration,
}

impl ShotOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            viewports: vec![ViewportKind::Desktop],
            output_dir: output_dir.into(),
            full_page: false,
            settle: DEFAULT_SETTLE,
        }
    }

    pub fn with_viewports(mut self, viewports: Vec<ViewportKind>) -> Self {
        self.viewports = viewports;
        self
    }

    pub fn with_full_page(mut self, full_page: bool) -> Self {
        self.full_page = full_page;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotReport {
    pub url: String,
    pub captures: Vec<CaptureResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    pub viewport: ViewportKind,
    pub output: Option<PathBuf>,
    pub success: bool,
    pub error: Option<String>,
}

impl CaptureResult {
    fn saved(viewport: ViewportKind, output: PathBuf) -> Self {
        Self {
            viewport,
            output: Some(output),
            success: true,
            error: None,
        }
    }

    fn failed(viewport: ViewportKind, output: Option<PathBuf>, error: impl ToString) -> Self {
        Self {
            viewport,
            output,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Error)]
enum CaptureError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Guard(#[from] GuardError),
}

/// Validate the URL, launch the driver and capture every requested
/// viewport into `<output_dir>/<host>_<viewport>.png`.
pub async fn capture_screenshots(
    session: &Arc<Session>,
    raw_url: &str,
    options: &ShotOptions,
) -> ShotReport {
    let mut report = ShotReport {
        url: raw_url.to_string(),
        captures: Vec::new(),
    };

    let validated = match session.validate_url(raw_url, CheckPhase::Navigation).await {
        Ok(validated) => validated,
        Err(e) => {
            for kind in &options.viewports {
                report.captures.push(CaptureResult::failed(*kind, None, &e));
            }
            return report;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&options.output_dir) {
        for kind in &options.viewports {
            report.captures.push(CaptureResult::failed(*kind, None, &e));
        }
        return report;
    }

    let page = match DriverPage::launch(session.clone()).await {
        Ok(page) => page,
        Err(e) => {
            for kind in &options.viewports {
                report.captures.push(CaptureResult::failed(*kind, None, &e));
            }
            return report;
        }
    };
    let gate = RequestGate::new(session.clone());

    capture_on(&page, &gate, &validated, options, &mut report).await;
    let _ = page.close().await;
    report
}

async fn capture_on(
    page: &dyn Page,
    gate: &RequestGate,
    url: &ValidatedUrl,
    options: &ShotOptions,
    report: &mut ShotReport,
) {
    let basename = screenshot_basename(url);
    for kind in &options.viewports {
        let viewport = gate.session().config().viewports.get(*kind);
        let path = options.output_dir.join(format!("{basename}_{kind}.png"));
        info!(viewport = %kind, path = %path.display(), "capturing screenshot");

        match capture_one(page, gate, url, viewport, &path, options).await {
            Ok(()) => report.captures.push(CaptureResult::saved(*kind, path)),
            Err(e) => report.captures.push(CaptureResult::failed(*kind, Some(path), e)),
        }
    }
}

async fn capture_one(
    page: &dyn Page,
    gate: &RequestGate,
    url: &ValidatedUrl,
    viewport: Viewport,
    path: &std::path::Path,
    options: &ShotOptions,
) -> Result<(), CaptureError> {
    let config = gate.session().config();
    page.set_viewport(viewport).await?;
    page.navigate(url.as_str(), config.wait, config.browser_timeout())
        .await?;
    gate.revalidate_final_url(&page.current_url().await?).await?;
    page.settle(options.settle).await?;
    page.screenshot(path, options.full_page).await?;
    Ok(())
}

/// Filename stem for a capture: host and port with dots and colons
/// flattened to underscores, so `example.com:8443` becomes
/// `example_com_8443`.
fn screenshot_basename(url: &ValidatedUrl) -> String {
    let mut base = url.hostname();
    if let Some(port) = url.port() {
        base.push(':');
        base.push_str(&port.to_string());
    }
    base.replace(['.', ':'], "_")
}

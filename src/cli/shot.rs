//! `pagewarden shot` — screenshot capture per viewport.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use colored::Colorize;

use crate::config::{ScanConfig, ViewportKind};
use crate::session::Session;
use crate::shot::{capture_screenshots, ShotOptions};

/// Run the `pagewarden shot` command.
pub async fn run_shot(
    mut config: ScanConfig,
    url: &str,
    output_dir: &Path,
    viewport: &str,
    all: bool,
    full: bool,
    settle_ms: u64,
    timeout_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    if let Some(ms) = timeout_ms {
        config.browser_timeout_ms = ms;
    }

    let viewports = if all {
        ViewportKind::all().to_vec()
    } else {
        let kind = ViewportKind::from_str_loose(viewport).ok_or_else(|| {
            anyhow!("Unknown viewport '{}'. Choose desktop, tablet or mobile.", viewport)
        })?;
        vec![kind]
    };

    let options = ShotOptions::new(output_dir)
        .with_viewports(viewports)
        .with_full_page(full)
        .with_settle(Duration::from_millis(settle_ms));

    let session = Arc::new(Session::new("shot", config)?.with_decision_log()?);
    let report = capture_screenshots(&session, url, &options).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for capture in &report.captures {
        println!("Capturing {} screenshot...", capture.viewport);
        match (&capture.output, &capture.error) {
            (Some(path), _) if capture.success => {
                println!("  Saved to {}", path.display());
            }
            (_, Some(error)) => {
                println!("  {} {}", "Failed:".red(), error);
            }
            _ => {}
        }
    }

    Ok(())
}

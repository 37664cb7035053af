//! `pagewarden visual` — above-the-fold and mobile rendering checks.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use crate::analyze::analyze_visual;
use crate::config::ScanConfig;
use crate::session::Session;

/// Run the `pagewarden visual` command.
pub async fn run_visual(
    mut config: ScanConfig,
    url: &str,
    timeout_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    if let Some(ms) = timeout_ms {
        config.browser_timeout_ms = ms;
    }

    let session = Arc::new(Session::new("visual", config)?.with_decision_log()?);
    let report = analyze_visual(&session, url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Visual Analysis Results");
    println!("{}", "=".repeat(40));

    println!();
    println!("Above the Fold:");
    println!("  H1 Visible: {}", check_mark(report.above_fold.h1_visible));
    println!("  CTA Visible: {}", check_mark(report.above_fold.cta_visible));
    println!(
        "  Hero Image: {}",
        report.above_fold.hero_image.as_deref().unwrap_or("None found")
    );

    println!();
    println!("Mobile Responsiveness:");
    println!("  Viewport Meta: {}", check_mark(report.mobile.viewport_meta));
    if report.mobile.horizontal_scroll {
        println!("  Horizontal Scroll: {} (problem)", "✗".red());
    } else {
        println!("  Horizontal Scroll: {}", "✓".green());
    }

    println!();
    println!("Typography:");
    match report.fonts.base_size {
        Some(size) => println!("  Base Font Size: {}px", size),
        None => println!("  Base Font Size: n/a"),
    }
    println!("  Readable (≥16px): {}", check_mark(report.fonts.readable));

    if let Some(error) = &report.error {
        println!();
        println!("{} {}", "Error:".red().bold(), error);
    }

    Ok(())
}

fn check_mark(ok: bool) -> colored::ColoredString {
    if ok {
        "✓".green()
    } else {
        "✗".red()
    }
}

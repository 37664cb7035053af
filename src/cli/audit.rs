//! `pagewarden audit` — landing-page quality report.
//!
//! Runs the desktop and mobile analysis passes, grades the result, and
//! prints either a text report or JSON (report plus grades). Analysis
//! failures land in the report's `error` field; the command itself only
//! fails on plumbing problems like an unreadable config.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use crate::analyze::{analyze_landing, grade_landing, LandingReport};
use crate::config::ScanConfig;
use crate::session::Session;

/// Run the `pagewarden audit` command.
pub async fn run_audit(
    mut config: ScanConfig,
    url: &str,
    timeout_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    if let Some(ms) = timeout_ms {
        config.browser_timeout_ms = ms;
    }

    let session = Arc::new(Session::new("audit", config)?.with_decision_log()?);
    let report = analyze_landing(&session, url).await;
    let grades = grade_landing(&report);

    if json {
        let mut value = serde_json::to_value(&report)?;
        value["grades"] = serde_json::to_value(&grades)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Landing Page Quality Analysis");
    println!("{}", "=".repeat(50));
    println!();
    println!("URL: {}", report.url);

    println!();
    println!("Performance:");
    let lcp = report.performance.lcp_ms;
    let lcp_status = match lcp {
        Some(ms) if ms < 2500 => "GOOD",
        Some(_) => "SLOW",
        None => "N/A",
    };
    println!("  LCP: {} ({})", fmt_ms(lcp), lcp_status);
    let cls = report.performance.cls;
    let cls_status = match cls {
        Some(v) if v < 0.1 => "GOOD",
        Some(_) => "POOR",
        None => "N/A",
    };
    println!("  CLS: {} ({})", fmt_opt(cls), cls_status);
    println!("  TTFB: {}", fmt_ms(report.performance.ttfb_ms));

    println!();
    println!("Content:");
    println!("  Title: {}", report.content.title.as_deref().unwrap_or(""));
    match report.content.h1.as_deref() {
        Some(h1) => println!("  H1: {}", h1),
        None => println!("  H1: {}", "MISSING".red()),
    }
    println!("  Words: {}", report.content.word_count);

    println!();
    println!("Conversion Elements:");
    println!("  CTA Above Fold: {}", yes_no(report.conversion.cta_above_fold));
    if report.conversion.form_present {
        println!("  Form: Y ({} fields)", report.conversion.form_fields);
    } else {
        println!("  Form: N");
    }
    println!("  Phone: {}", yes_no(report.conversion.phone_number));
    println!("  Chat: {}", yes_no(report.conversion.chat_widget));

    println!();
    if report.schema.types_found.is_empty() {
        println!("Schema: None");
    } else {
        println!("Schema: {}", report.schema.types_found.join(", "));
    }

    println!();
    println!("Audit Grades:");
    for (check, grade) in grades.entries() {
        println!("  [{}] {}", grade.colorized(), check);
    }

    print_report_error(&report);
    Ok(())
}

fn print_report_error(report: &LandingReport) {
    if let Some(error) = &report.error {
        println!();
        println!("{} {}", "Error:".red().bold(), error);
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Y"
    } else {
        "N"
    }
}

fn fmt_ms(value: Option<u64>) -> String {
    match value {
        Some(ms) => format!("{}ms", ms),
        None => "n/a".to_string(),
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "n/a".to_string(),
    }
}

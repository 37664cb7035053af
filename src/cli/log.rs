//! `pagewarden log` — browse the decision log.
//!
//! Shows what a scan touched: every URL the guard ruled on, which were
//! allowed, which were blocked and why. This is the "what did that scan
//! just do?" command.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::audit::{CheckPhase, DecisionReader, LogFilter, OutcomeFilter};
use crate::config::ScanConfig;

/// Run the `pagewarden log` command.
pub fn run_log(
    config: &ScanConfig,
    session_id: Option<&str>,
    phase_filter: Option<&str>,
    blocked_only: bool,
    last: Option<usize>,
    summary_only: bool,
) -> Result<()> {
    let reader = reader_for(config)?;

    let records = if let Some(sid) = session_id {
        reader
            .read_session(sid)
            .with_context(|| format!("Failed to read session: {}", sid))?
    } else {
        let records = reader.read_latest_session()?;
        if records.is_empty() {
            println!();
            println!("  {} No decision logs found.", "ℹ".blue());
            println!("  Run a scan first:");
            println!("    {}", "pagewarden fetch <url>".dimmed());
            println!();
            return Ok(());
        }
        records
    };

    let filter = LogFilter {
        session_id: session_id.map(|s| s.to_string()),
        phase: phase_filter.and_then(CheckPhase::from_str_loose),
        outcome: blocked_only.then_some(OutcomeFilter::Blocked),
        limit: last,
    };
    let filtered = DecisionReader::filter_records(&records, &filter);
    let summary = DecisionReader::summarize(&records);

    if summary_only {
        println!();
        println!("  Session: {}", summary.session_id.cyan());
        println!("  Command: {}", summary.command);
        println!();
        println!(
            "  {} checks | {} allowed | {} blocked | {} hosts",
            summary.total_checks.to_string().bold(),
            summary.allowed.to_string().green().bold(),
            summary.blocked.to_string().red().bold(),
            summary.unique_hosts.to_string().bold(),
        );
        if let (Some(start), Some(end)) = (summary.start_time, summary.end_time) {
            let duration = end - start;
            println!("  Duration: {}", format_duration(duration.num_seconds()));
        }
        println!();
        return Ok(());
    }

    println!();
    if let Some(first) = filtered.first() {
        println!(
            "  Session: {} | Command: {}",
            first.session_id.cyan(),
            first.command
        );
        println!();
    }

    for record in &filtered {
        println!("  {}", DecisionReader::format_record(record));
    }

    println!();
    println!(
        "  {} {}",
        "─".repeat(40).dimmed(),
        summary.one_line().dimmed()
    );
    println!();

    Ok(())
}

/// List available sessions.
pub fn run_log_list(config: &ScanConfig) -> Result<()> {
    let reader = reader_for(config)?;
    let sessions = reader.list_sessions()?;

    if sessions.is_empty() {
        println!();
        println!("  {} No sessions found.", "ℹ".blue());
        println!();
        return Ok(());
    }

    println!();
    println!("  Recorded sessions:");
    println!();
    for session in &sessions {
        println!("  • {}", session);
    }
    println!();
    println!(
        "  View a session: {}",
        "pagewarden log --session <id>".dimmed()
    );
    println!();

    Ok(())
}

/// A reader over the config's log directory, or the default one.
pub fn reader_for(config: &ScanConfig) -> Result<DecisionReader> {
    match &config.log_dir {
        Some(dir) => Ok(DecisionReader::with_dir(dir)),
        None => DecisionReader::new().context("Failed to open log directory"),
    }
}

fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

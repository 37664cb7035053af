//! `pagewarden check` — ask the guard about one URL.
//!
//! Runs the full validation pipeline (scheme, deny list, resolution,
//! address classes) without fetching anything. Exit 0 when the guard
//! would allow the URL, 1 when it would block. `--json` prints the
//! decision record instead of the friendly text.

use anyhow::Result;
use colored::Colorize;

use crate::audit::{CheckPhase, DecisionRecord};
use crate::config::ScanConfig;
use crate::session::Session;

/// Run the `pagewarden check` command.
pub async fn run_check(config: ScanConfig, url: &str, json: bool) -> Result<()> {
    let session = Session::new("check", config)?.with_decision_log()?;

    match session.validate_url(url, CheckPhase::Navigation).await {
        Ok(validated) => {
            if json {
                let record = DecisionRecord::allowed(
                    session.id(),
                    session.command(),
                    CheckPhase::Navigation,
                    validated.as_str(),
                    Some(validated.hostname()),
                );
                println!("{}", serde_json::to_string_pretty(&record)?);
                return Ok(());
            }

            println!();
            println!("  {} {}", "✓".green().bold(), "Allowed".green().bold());
            println!("  URL:  {}", validated.as_str().bold());
            println!("  Host: {}", validated.hostname().cyan());
            if let Some(path) = session.log_path() {
                println!("  Log:  {}", path.display().to_string().dimmed());
            }
            println!();
            Ok(())
        }
        Err(error) => {
            if json {
                let record = DecisionRecord::blocked(
                    session.id(),
                    session.command(),
                    CheckPhase::Navigation,
                    url.trim(),
                    hostname_hint(url),
                    &error,
                );
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            Err(anyhow::Error::new(error))
        }
    }
}

/// Best-effort hostname for the printed record; the URL may not parse.
fn hostname_hint(raw: &str) -> Option<String> {
    url::Url::parse(raw.trim())
        .ok()
        .and_then(|url| crate::guard::url::hostname_of(&url))
}

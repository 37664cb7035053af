//! `pagewarden fetch` — guarded HTTP fetch.
//!
//! Body goes to stdout (or `--output <file>`), metadata to stderr, so the
//! command pipes cleanly into further processing. `--json` swaps both for
//! one machine-readable report on stdout.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::ScanConfig;
use crate::fetch::{FinalResponse, PageFetcher};
use crate::session::Session;

/// What `fetch --json` prints. Mirrors [`FinalResponse`], with the
/// requested URL kept alongside the final one and room for an error.
#[derive(Debug, Default, Serialize)]
struct FetchReport {
    url: String,
    final_url: Option<String>,
    status_code: Option<u16>,
    headers: BTreeMap<String, String>,
    content: String,
    redirect_chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl FetchReport {
    fn success(url: &str, response: FinalResponse) -> Self {
        Self {
            url: url.to_string(),
            final_url: Some(response.url),
            status_code: Some(response.status_code),
            headers: response.headers,
            content: response.content,
            redirect_chain: response.redirect_chain,
            error: None,
        }
    }

    fn failure(url: &str, error: &impl ToString) -> Self {
        Self {
            url: url.to_string(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

/// Run the `pagewarden fetch` command.
pub async fn run_fetch(
    mut config: ScanConfig,
    url: &str,
    timeout: Option<u64>,
    max_redirects: Option<usize>,
    no_redirects: bool,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    if let Some(secs) = timeout {
        config.timeout_secs = secs;
    }
    if let Some(max) = max_redirects {
        config.max_redirects = max;
    }

    let session = Session::new("fetch", config)?.with_decision_log()?;
    let fetcher = PageFetcher::new(session.config())?.follow_redirects(!no_redirects);

    let response = match fetcher.fetch(&session, url).await {
        Ok(response) => response,
        Err(error) => {
            if json {
                let report = FetchReport::failure(url, &error);
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            return Err(anyhow::Error::new(error));
        }
    };

    if json {
        let report = FetchReport::success(url, response);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(path) = output {
        std::fs::write(path, &response.content)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;
        println!("Saved to {}", path.display());
    } else {
        println!("{}", response.content);
    }

    eprintln!();
    eprintln!("URL: {}", response.url);
    eprintln!("Status: {}", response.status_code);
    if !response.redirect_chain.is_empty() {
        eprintln!("Redirects: {}", response.redirect_chain.join(" -> "));
    }

    Ok(())
}

//! PageWarden — SSRF-guarded page fetching and auditing.
//!
//! Every URL a command touches passes the guard before any connection is
//! made: the navigation target, each redirect hop, each request the
//! rendered page fires, and the URL it finally lands on.
//!
//! Quick start:
//!   pagewarden check https://example.com    # would the guard allow it?
//!   pagewarden fetch https://example.com    # guarded fetch, body to stdout
//!   pagewarden audit https://example.com    # landing-page quality report
//!   pagewarden log                          # what did the last scan touch?
//!
//! For more info: pagewarden --help

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use pagewarden::audit::DecisionReader;
use pagewarden::cli;
use pagewarden::config::{self, ScanConfig};

/// PageWarden — fetch and audit pages without getting forged into
/// internal address space.
#[derive(Parser)]
#[command(
    name = "pagewarden",
    version,
    about = "SSRF-guarded page fetching, auditing and screenshots",
    long_about = "PageWarden fetches, audits and screenshots web pages while a\n\
                  request guard validates every URL before any connection:\n\
                  navigation, redirects, page subresources, final landing URL.\n\n\
                  Quick start:\n  \
                  pagewarden check <url>     # would the guard allow it?\n  \
                  pagewarden fetch <url>     # guarded fetch, body to stdout\n  \
                  pagewarden audit <url>     # landing-page quality report\n  \
                  pagewarden log             # what did the last scan touch?"
)]
struct Cli {
    /// Config file (default: discover .pagewarden.yaml walking up)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page, validating every redirect hop on the way
    Fetch {
        /// URL to fetch
        url: String,

        /// Timeout in seconds
        #[arg(short, long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Redirect hops to follow before giving up
        #[arg(long, value_name = "N")]
        max_redirects: Option<usize>,

        /// Return the first response without following redirects
        #[arg(long)]
        no_redirects: bool,

        /// Write the body to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print the full result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Audit landing-page quality (performance, content, conversion)
    Audit {
        /// URL to analyze
        url: String,

        /// Page-load timeout in milliseconds
        #[arg(short, long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Output as JSON (report plus grades)
        #[arg(short, long)]
        json: bool,
    },

    /// Check above-the-fold and mobile rendering
    Visual {
        /// URL to analyze
        url: String,

        /// Page-load timeout in milliseconds
        #[arg(short, long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Capture screenshots per viewport
    Shot {
        /// URL to capture
        url: String,

        /// Output directory
        #[arg(short, long, default_value = "screenshots", value_name = "DIR")]
        output_dir: PathBuf,

        /// Viewport to capture: desktop, tablet or mobile
        #[arg(long, default_value = "desktop")]
        viewport: String,

        /// Capture all three viewports
        #[arg(short, long)]
        all: bool,

        /// Capture the full page height, not just the viewport
        #[arg(short, long)]
        full: bool,

        /// Settle delay after load, in milliseconds
        #[arg(long, default_value_t = 1000, value_name = "MS")]
        settle_ms: u64,

        /// Page-load timeout in milliseconds
        #[arg(short, long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Print a JSON summary
        #[arg(short, long)]
        json: bool,
    },

    /// Ask the guard about a URL without fetching it
    Check {
        /// URL (or bare hostname) to validate
        url: String,

        /// Print the decision record as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Write a starter config file
    Init {
        /// Where to write it (default: .pagewarden.yaml here)
        #[arg(short, long, value_name = "PATH")]
        output: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// See what a scan touched and what the guard blocked
    Log {
        /// Show a specific session
        #[arg(short, long, help = "Session ID to view")]
        session: Option<String>,

        /// Filter by phase
        #[arg(
            short,
            long,
            help = "Filter: navigation, subresource, redirect, final-url"
        )]
        phase: Option<String>,

        /// Show only blocked decisions
        #[arg(short, long)]
        blocked: bool,

        /// Limit number of records shown
        #[arg(short, long, help = "Max records to show", value_name = "N")]
        last: Option<usize>,

        /// Show only the session summary
        #[arg(long)]
        summary: bool,

        /// List all recorded sessions
        #[arg(long)]
        list: bool,
    },
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Quiet by default; -v raises the crate filter, RUST_LOG still wins.
    // Diagnostics go to stderr so `fetch` can pipe its body from stdout.
    let directive = match args.verbose {
        0 => "pagewarden=warn",
        1 => "pagewarden=info",
        2 => "pagewarden=debug",
        _ => "pagewarden=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(e) = run(args).await {
        eprintln!();
        eprintln!("  {} {}", "✗".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  {} {}", "caused by:".dimmed(), cause);
        }
        eprintln!();
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> anyhow::Result<()> {
    let config = config::load_config(args.config.as_deref())?;

    match args.command {
        // ── No subcommand: show status ──
        None => show_status(args.config.as_deref(), &config),

        Some(Commands::Fetch {
            url,
            timeout,
            max_redirects,
            no_redirects,
            output,
            json,
        }) => {
            cli::fetch::run_fetch(
                config,
                &url,
                timeout,
                max_redirects,
                no_redirects,
                output.as_deref(),
                json,
            )
            .await
        }

        Some(Commands::Audit {
            url,
            timeout_ms,
            json,
        }) => cli::audit::run_audit(config, &url, timeout_ms, json).await,

        Some(Commands::Visual {
            url,
            timeout_ms,
            json,
        }) => cli::visual::run_visual(config, &url, timeout_ms, json).await,

        Some(Commands::Shot {
            url,
            output_dir,
            viewport,
            all,
            full,
            settle_ms,
            timeout_ms,
            json,
        }) => {
            cli::shot::run_shot(
                config,
                &url,
                &output_dir,
                &viewport,
                all,
                full,
                settle_ms,
                timeout_ms,
                json,
            )
            .await
        }

        Some(Commands::Check { url, json }) => cli::check::run_check(config, &url, json).await,

        Some(Commands::Init { output, force }) => cli::init::run_init(output.as_deref(), force),

        Some(Commands::Log {
            session,
            phase,
            blocked,
            last,
            summary,
            list,
        }) => {
            if list {
                cli::log::run_log_list(&config)
            } else {
                cli::log::run_log(
                    &config,
                    session.as_deref(),
                    phase.as_deref(),
                    blocked,
                    last,
                    summary,
                )
            }
        }
    }
}

/// `pagewarden` with no arguments: where the config came from, what the
/// guard is set to, what the last scan did.
fn show_status(explicit_config: Option<&std::path::Path>, config: &ScanConfig) -> anyhow::Result<()> {
    println!();
    println!(
        "  {}  {}",
        "pagewarden".bold(),
        "— request guard for page scans".green()
    );
    println!(
        "  {}",
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".dimmed()
    );
    println!();

    match config_source(explicit_config) {
        Some(path) => println!("  Config: {}", path.display().to_string().cyan()),
        None => println!(
            "  Config: {} ({})",
            "built-in defaults".cyan(),
            "pagewarden init to customize".dimmed()
        ),
    }
    println!(
        "  Guard:  {} redirect hops max, wait {}, {}s fetch timeout",
        config.max_redirects, config.wait, config.timeout_secs
    );
    if !config.deny_hosts.is_empty() {
        println!("  Deny:   {}", config.deny_hosts.join(", "));
    }

    // Recent activity, if any scans ran.
    if let Ok(reader) = cli::log::reader_for(config) {
        if let Ok(records) = reader.read_latest_session() {
            if !records.is_empty() {
                let summary = DecisionReader::summarize(&records);
                println!();
                println!(
                    "  Last session: {} checks ({} allowed, {} blocked)",
                    summary.total_checks.to_string().bold(),
                    summary.allowed.to_string().green(),
                    summary.blocked.to_string().red(),
                );
            }
        }
    }

    println!();
    println!("  {}", "Commands:".dimmed());
    println!(
        "    {}   would the guard allow this URL?",
        "pagewarden check <url>".bold()
    );
    println!(
        "    {}   guarded fetch, body to stdout",
        "pagewarden fetch <url>".bold()
    );
    println!(
        "    {}   landing-page quality report",
        "pagewarden audit <url>".bold()
    );
    println!(
        "    {}    screenshots per viewport",
        "pagewarden shot <url>".bold()
    );
    println!(
        "    {}           decisions from the last scan",
        "pagewarden log".bold()
    );
    println!();

    Ok(())
}

/// Which config file a command would load, if any.
fn config_source(explicit: Option<&std::path::Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    if let Some(path) = config::discover_config_path(&cwd) {
        return Some(path);
    }
    config::parser::user_config_path().filter(|path| path.exists())
}

//! `pagewarden init` — write a starter config file.
//!
//! Creates a fully commented `.pagewarden.yaml` in the current directory
//! (or at `--output`). Every value in the template matches the built-in
//! default, so the fresh file changes nothing until edited.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::defaults::STARTER_CONFIG_YAML;
use crate::config::parser::CONFIG_FILE_NAME;

/// Run the `pagewarden init` command.
pub fn run_init(output_path: Option<&str>, force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let output_file = output_path
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.join(CONFIG_FILE_NAME));

    if output_file.exists() && !force {
        println!(
            "{} A config file already exists at {}",
            "⚠".yellow(),
            output_file.display()
        );
        println!("  Use --force to overwrite it, or edit it directly.");
        return Ok(());
    }

    std::fs::write(&output_file, STARTER_CONFIG_YAML)
        .with_context(|| format!("Failed to write config file: {}", output_file.display()))?;

    println!();
    println!(
        "  {} Created {}",
        "✓".green().bold(),
        output_file.display().to_string().bold()
    );
    println!();
    println!("  {} What the guard does:", "ℹ".blue());
    println!("    • Blocks URLs that resolve to private, loopback or link-local addresses");
    println!("    • Re-validates every redirect hop and the final landing URL");
    println!("    • Holds browser subresource requests until each one is cleared");
    println!("    • Records every allow/block decision to ~/.pagewarden/logs");
    println!();
    println!("  {} Next steps:", "→".blue());
    println!(
        "    1. Review the config: {}",
        format!("cat {}", output_file.display()).dimmed()
    );
    println!(
        "    2. Try a guarded fetch: {}",
        "pagewarden fetch https://example.com".dimmed()
    );
    println!(
        "    3. See what was checked: {}",
        "pagewarden log".dimmed()
    );
    println!();

    Ok(())
}

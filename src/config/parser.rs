//! Config file loading and validation.
//!
//! Configs are YAML, discovered by walking up from the working directory
//! (like a `.gitignore`), with `~/.pagewarden/config.yaml` as the
//! user-level fallback. Every field is optional; a missing or empty file
//! means defaults.

use anyhow::{bail, Context, Result};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::config::types::ScanConfig;

/// Project-level config file name, discovered by walking up.
pub const CONFIG_FILE_NAME: &str = ".pagewarden.yaml";

/// Parse a YAML config from a file path.
pub fn parse_config_file(path: impl AsRef<Path>) -> Result<ScanConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse a YAML config string and validate it.
pub fn parse_config_str(yaml: &str) -> Result<ScanConfig> {
    let config: ScanConfig = if yaml.trim().is_empty() {
        ScanConfig::default()
    } else {
        serde_yaml::from_str(yaml).context("Invalid YAML syntax in config file")?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Reject configs that would fail later in confusing ways: bad globs, bad
/// override addresses, zero timeouts. The resolver overlay re-checks
/// override addresses at resolve time regardless.
fn validate_config(config: &ScanConfig) -> Result<()> {
    if config.user_agent.trim().is_empty() {
        bail!("'user_agent' must not be empty");
    }
    if config.timeout_secs == 0 {
        bail!("'timeout_secs' must be at least 1");
    }
    if config.browser_timeout_ms == 0 {
        bail!("'browser_timeout_ms' must be at least 1");
    }

    for pattern in &config.deny_hosts {
        globset::Glob::new(pattern)
            .with_context(|| format!("Invalid deny_hosts pattern '{}'", pattern))?;
    }

    for (hostname, addrs) in &config.dns_overrides {
        if addrs.is_empty() {
            bail!("dns_overrides entry '{}' lists no addresses", hostname);
        }
        for addr in addrs {
            addr.parse::<IpAddr>().with_context(|| {
                format!("dns_overrides entry '{}' has invalid IP '{}'", hostname, addr)
            })?;
        }
    }

    for kind in crate::config::types::ViewportKind::all() {
        let viewport = config.viewports.get(kind);
        if viewport.width == 0 || viewport.height == 0 {
            bail!("Viewport '{}' has zero width or height", kind);
        }
        if viewport.scale <= 0.0 {
            bail!("Viewport '{}' has non-positive scale", kind);
        }
    }

    Ok(())
}

/// Find `.pagewarden.yaml` walking up the directory tree from `start`.
pub fn discover_config_path(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// User-level fallback config path: `~/.pagewarden/config.yaml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pagewarden").join("config.yaml"))
}

/// Load configuration for a command.
///
/// An explicit `--config` path must exist and parse. Otherwise the project
/// config is discovered walking up from the working directory, then the
/// user config, then defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ScanConfig> {
    if let Some(path) = explicit {
        return parse_config_file(path);
    }

    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    if let Some(path) = discover_config_path(&cwd) {
        return parse_config_file(path);
    }

    if let Some(path) = user_config_path() {
        if path.exists() {
            return parse_config_file(path);
        }
    }

    Ok(ScanConfig::default())
}

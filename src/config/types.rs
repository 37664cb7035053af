//! Scan configuration types.
//!
//! A [`ScanConfig`] is plain data straight from YAML. Compiled forms (the
//! host deny list, the resolver overlay) are built from it when a session
//! starts, so a config value can be loaded, printed, and round-tripped
//! without side effects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default User-Agent sent on plain fetches and passed to the browser.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; PageWarden/0.1; +https://github.com/abcxz/pagewarden)";

/// Browser driver binary spawned for browser-backed commands when the
/// config does not name one.
pub const DEFAULT_DRIVER: &str = "pagewarden-driver";

/// Named viewport preset selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportKind {
    Desktop,
    Tablet,
    Mobile,
}

impl ViewportKind {
    /// Parse a viewport name from the CLI. Accepts short aliases.
    pub fn from_str_loose(s: &str) -> Option<ViewportKind> {
        match s.to_lowercase().trim() {
            "desktop" | "d" => Some(ViewportKind::Desktop),
            "tablet" | "t" => Some(ViewportKind::Tablet),
            "mobile" | "m" | "phone" => Some(ViewportKind::Mobile),
            _ => None,
        }
    }

    pub fn all() -> [ViewportKind; 3] {
        [
            ViewportKind::Desktop,
            ViewportKind::Tablet,
            ViewportKind::Mobile,
        ]
    }
}

impl fmt::Display for ViewportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewportKind::Desktop => write!(f, "desktop"),
            ViewportKind::Tablet => write!(f, "tablet"),
            ViewportKind::Mobile => write!(f, "mobile"),
        }
    }
}

/// Browser viewport geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Device scale factor. 2 renders high-DPI, used for mobile capture.
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Viewport {
    pub const DESKTOP: Viewport = Viewport {
        width: 1920,
        height: 1080,
        scale: 1.0,
    };
    pub const TABLET: Viewport = Viewport {
        width: 768,
        height: 1024,
        scale: 1.0,
    };
    pub const MOBILE: Viewport = Viewport {
        width: 375,
        height: 812,
        scale: 2.0,
    };
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.scale)
    }
}

/// The three viewports browser commands work with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSet {
    pub desktop: Viewport,
    pub tablet: Viewport,
    pub mobile: Viewport,
}

impl Default for ViewportSet {
    fn default() -> Self {
        Self {
            desktop: Viewport::DESKTOP,
            tablet: Viewport::TABLET,
            mobile: Viewport::MOBILE,
        }
    }
}

impl ViewportSet {
    pub fn get(&self, kind: ViewportKind) -> Viewport {
        match kind {
            ViewportKind::Desktop => self.desktop,
            ViewportKind::Tablet => self.tablet,
            ViewportKind::Mobile => self.mobile,
        }
    }
}

/// When a browser navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// The load event fired.
    Load,
    /// DOMContentLoaded fired.
    DomContentLoaded,
    /// No network activity for 500ms. The default: analyses read
    /// post-hydration state, not just the initial document.
    #[default]
    NetworkIdle,
}

impl WaitUntil {
    /// Wire form understood by the browser driver.
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
        }
    }
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a scan session needs, loaded from `.pagewarden.yaml`.
/// Every field has a default, so an empty config file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// User-Agent header for fetches and browser navigation.
    pub user_agent: String,

    /// Timeout for plain HTTP fetches, in seconds.
    pub timeout_secs: u64,

    /// Page-load timeout for browser-backed commands, in milliseconds.
    pub browser_timeout_ms: u64,

    /// Redirect hops followed before giving up.
    pub max_redirects: usize,

    /// Navigation wait policy for browser-backed commands.
    pub wait: WaitUntil,

    /// Hostname glob patterns blocked before DNS resolution.
    /// Example: ["*.internal.corp", "admin.*"]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deny_hosts: Vec<String>,

    /// Pin hostnames to fixed addresses, bypassing DNS.
    /// The same pins are handed to the HTTP client, so the connection
    /// goes where the check looked.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub dns_overrides: HashMap<String, Vec<String>>,

    /// Viewport geometry per preset.
    pub viewports: ViewportSet,

    /// Where decision logs go. Defaults to ~/.pagewarden/logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Browser driver command (argv). Defaults to ["pagewarden-driver"].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<Vec<String>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            browser_timeout_ms: 30_000,
            max_redirects: 5,
            wait: WaitUntil::NetworkIdle,
            deny_hosts: Vec::new(),
            dns_overrides: HashMap::new(),
            viewports: ViewportSet::default(),
            log_dir: None,
            driver: None,
        }
    }
}

impl ScanConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_millis(self.browser_timeout_ms)
    }

    /// The driver command to spawn, with the default applied.
    pub fn driver_command(&self) -> Vec<String> {
        match &self.driver {
            Some(argv) if !argv.is_empty() => argv.clone(),
            _ => vec![DEFAULT_DRIVER.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_presets_match_capture_defaults() {
        let set = ViewportSet::default();
        assert_eq!(set.get(ViewportKind::Desktop).width, 1920);
        assert_eq!(set.get(ViewportKind::Desktop).height, 1080);
        assert_eq!(set.get(ViewportKind::Tablet).width, 768);
        assert_eq!(set.get(ViewportKind::Mobile).width, 375);
        assert_eq!(set.get(ViewportKind::Mobile).height, 812);
        assert_eq!(set.get(ViewportKind::Mobile).scale, 2.0);
    }

    #[test]
    fn test_viewport_kind_aliases() {
        assert_eq!(
            ViewportKind::from_str_loose("Desktop"),
            Some(ViewportKind::Desktop)
        );
        assert_eq!(
            ViewportKind::from_str_loose("m"),
            Some(ViewportKind::Mobile)
        );
        assert_eq!(
            ViewportKind::from_str_loose("phone"),
            Some(ViewportKind::Mobile)
        );
        assert_eq!(ViewportKind::from_str_loose("tv"), None);
    }

    #[test]
    fn test_default_config_values() {
        let config = ScanConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.browser_timeout_ms, 30_000);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.wait, WaitUntil::NetworkIdle);
        assert!(config.deny_hosts.is_empty());
        assert_eq!(config.driver_command(), vec!["pagewarden-driver"]);
    }

    #[test]
    fn test_wait_until_wire_form() {
        assert_eq!(WaitUntil::NetworkIdle.as_str(), "networkidle");
        assert_eq!(WaitUntil::DomContentLoaded.as_str(), "domcontentloaded");
        assert_eq!(WaitUntil::Load.as_str(), "load");
    }
}

//! Starter config template written by `pagewarden init`.

/// Default config, fully commented. Every value shown matches the built-in
/// default, so a fresh file changes nothing until edited.
pub const STARTER_CONFIG_YAML: &str = r#"# PageWarden configuration
# Controls how pages are fetched, rendered, and guarded.
# Delete any line to fall back to the built-in default.

# Sent on plain fetches and browser navigation.
user_agent: "Mozilla/5.0 (compatible; PageWarden/0.1; +https://github.com/abcxz/pagewarden)"

# Plain HTTP fetch timeout, in seconds.
timeout_secs: 30

# Page-load timeout for browser commands (audit/visual/shot), in milliseconds.
browser_timeout_ms: 30000

# Redirect hops followed before giving up. Every hop is re-validated.
max_redirects: 5

# When browser navigation counts as done: load | domcontentloaded | networkidle
wait: networkidle

# Hostname patterns blocked before DNS even runs.
# deny_hosts:
#   - "*.internal.corp"
#   - "admin.*"

# Pin hostnames to fixed addresses (handy for staging behind split DNS).
# The HTTP client connects to the pinned address, not whatever DNS says.
# Pinned addresses still have to be public, or the scan is blocked.
# dns_overrides:
#   staging.example.com: ["93.184.216.34"]

# Viewport geometry per preset.
viewports:
  desktop: { width: 1920, height: 1080, scale: 1 }
  tablet: { width: 768, height: 1024, scale: 1 }
  mobile: { width: 375, height: 812, scale: 2 }

# Where decision logs go. Default: ~/.pagewarden/logs
# log_dir: /var/log/pagewarden

# Browser driver command for audit/visual/shot.
# driver: ["pagewarden-driver"]
"#;

//! Visual and layout checks against the rendered page.
//!
//! A lighter sibling of the landing analyzer: the desktop pass checks
//! what sits above the fold (h1, a call-to-action, a hero image) and the
//! mobile pass checks responsiveness basics. Probes that find nothing
//! leave the report at its defaults; only engine and guard failures set
//! `error`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analyze::{js, AnalysisError};
use crate::audit::CheckPhase;
use crate::browser::{DriverPage, Page, RequestGate};
use crate::guard::ValidatedUrl;
use crate::session::Session;

/// Call-to-action probes for the above-the-fold check.
const CTA_SELECTORS: [&str; 8] = [
    "a[href*='signup']",
    "a[href*='contact']",
    "a[href*='demo']",
    "button:has-text('Get Started')",
    "button:has-text('Sign Up')",
    "button:has-text('Contact')",
    ".cta",
    "[class*='cta']",
];

/// Where hero images usually live. First probe with a non-empty src wins.
const HERO_SELECTORS: [&str; 4] = [
    ".hero img",
    "[class*='hero'] img",
    "header img",
    "main img:first-of-type",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualReport {
    pub url: String,
    pub above_fold: AboveFoldChecks,
    pub mobile: MobileViewChecks,
    pub layout: LayoutChecks,
    pub fonts: FontChecks,
    pub error: Option<String>,
}

impl VisualReport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            above_fold: AboveFoldChecks::default(),
            mobile: MobileViewChecks::default(),
            layout: LayoutChecks::default(),
            fonts: FontChecks::default(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AboveFoldChecks {
    pub h1_visible: bool,
    pub cta_visible: bool,
    pub hero_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileViewChecks {
    pub viewport_meta: bool,
    pub horizontal_scroll: bool,
    /// Reserved in the report shape; no probe fills it yet.
    pub touch_targets_ok: bool,
}

impl Default for MobileViewChecks {
    fn default() -> Self {
        Self {
            viewport_meta: false,
            horizontal_scroll: false,
            touch_targets_ok: true,
        }
    }
}

/// Reserved in the report shape; no probe fills these yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutChecks {
    pub overlapping_elements: Vec<String>,
    pub text_overflow: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontChecks {
    /// Computed body font size in px, when the mobile pass measured it.
    pub base_size: Option<f64>,
    pub readable: bool,
}

impl Default for FontChecks {
    fn default() -> Self {
        Self {
            base_size: None,
            // Readable until measured otherwise.
            readable: true,
        }
    }
}

/// Validate the URL, launch the driver and run both visual passes.
pub async fn analyze_visual(session: &Arc<Session>, raw_url: &str) -> VisualReport {
    let mut report = VisualReport::new(raw_url);

    let validated = match session.validate_url(raw_url, CheckPhase::Navigation).await {
        Ok(validated) => validated,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };

    let page = match DriverPage::launch(session.clone()).await {
        Ok(page) => page,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };
    let gate = RequestGate::new(session.clone());

    visual_on(&page, &gate, &validated, &mut report).await;
    let _ = page.close().await;
    report
}

async fn visual_on(
    page: &dyn Page,
    gate: &RequestGate,
    url: &ValidatedUrl,
    report: &mut VisualReport,
) {
    if let Err(e) = desktop_pass(page, gate, url, report).await {
        report.error = Some(e.to_string());
        return;
    }
    if let Err(e) = mobile_pass(page, gate, url, report).await {
        report.error = Some(e.to_string());
    }
}

async fn desktop_pass(
    page: &dyn Page,
    gate: &RequestGate,
    url: &ValidatedUrl,
    report: &mut VisualReport,
) -> Result<(), AnalysisError> {
    let config = gate.session().config();
    page.set_viewport(config.viewports.desktop).await?;
    page.navigate(url.as_str(), config.wait, config.browser_timeout())
        .await?;
    gate.revalidate_final_url(&page.current_url().await?).await?;

    let fold = f64::from(config.viewports.desktop.height);

    if let Some(h1) = page.query("h1").await? {
        report.above_fold.h1_visible = h1.above_fold(fold);
    }

    for selector in CTA_SELECTORS {
        if let Some(cta) = page.query(selector).await? {
            if cta.above_fold(fold) {
                report.above_fold.cta_visible = true;
                break;
            }
        }
    }

    for selector in HERO_SELECTORS {
        if let Some(hero) = page.query(selector).await? {
            if let Some(src) = hero.attr("src").filter(|src| !src.is_empty()) {
                report.above_fold.hero_image = Some(src.to_string());
                break;
            }
        }
    }

    Ok(())
}

async fn mobile_pass(
    page: &dyn Page,
    gate: &RequestGate,
    url: &ValidatedUrl,
    report: &mut VisualReport,
) -> Result<(), AnalysisError> {
    let config = gate.session().config();
    page.set_viewport(config.viewports.mobile).await?;
    page.navigate(url.as_str(), config.wait, config.browser_timeout())
        .await?;
    gate.revalidate_final_url(&page.current_url().await?).await?;

    report.mobile.viewport_meta = page.query(r#"meta[name="viewport"]"#).await?.is_some();

    let scroll_width = page.eval(js::SCROLL_WIDTH).await?.as_f64();
    let inner_width = page.eval(js::INNER_WIDTH).await?.as_f64();
    if let (Some(scroll), Some(inner)) = (scroll_width, inner_width) {
        report.mobile.horizontal_scroll = scroll > inner;
    }

    if let Some(size) = page.eval(js::BASE_FONT_SIZE).await?.as_f64() {
        report.fonts.base_size = Some(size);
        report.fonts.readable = size >= 16.0;
    }

    Ok(())
}

//! Landing-page quality analysis.
//!
//! Two passes over the target, desktop first and then mobile, sharing the
//! session's host cache so no hostname is resolved twice. The desktop pass
//! gathers load timings, content, conversion elements, trust signals and
//! structured data; the mobile pass measures LCP and responsiveness.
//! Failures of any kind land in the report's `error` field rather than
//! aborting the CLI.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analyze::{js, AnalysisError};
use crate::audit::CheckPhase;
use crate::browser::{DriverPage, Page, RequestGate};
use crate::guard::ValidatedUrl;
use crate::session::Session;

/// Selectors that usually mark a call-to-action element. Checked in
/// order; the first one rendering above the fold counts.
const CTA_SELECTORS: [&str; 14] = [
    "a[href*='signup']",
    "a[href*='register']",
    "a[href*='contact']",
    "a[href*='demo']",
    "a[href*='trial']",
    "a[href*='buy']",
    "button:has-text('Get Started')",
    "button:has-text('Sign Up')",
    "button:has-text('Buy Now')",
    "button:has-text('Contact')",
    "button:has-text('Free Trial')",
    "button:has-text('Book')",
    ".cta",
    "[class*='cta']",
];

/// Markers left by the common chat widgets.
const CHAT_SELECTORS: [&str; 6] = [
    "[class*='chat']",
    "[id*='chat']",
    "[class*='intercom']",
    "[class*='drift']",
    "[class*='hubspot']",
    "[class*='zendesk']",
];

const TESTIMONIAL_KEYWORDS: [&str; 3] = ["testimonial", "customer said", "what our"];
const TRUST_BADGE_KEYWORDS: [&str; 4] = ["trusted by", "as seen", "certified", "award"];

/// Form inputs a visitor actually has to fill in.
const FORM_FIELDS_SELECTOR: &str = "form input:not([type='hidden']):not([type='submit'])";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingReport {
    pub url: String,
    pub performance: PerformanceMetrics,
    pub content: ContentSummary,
    pub conversion: ConversionSignals,
    pub trust: TrustSignals,
    pub mobile: MobileChecks,
    pub schema: SchemaMarkup,
    pub error: Option<String>,
}

impl LandingReport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            performance: PerformanceMetrics::default(),
            content: ContentSummary::default(),
            conversion: ConversionSignals::default(),
            trust: TrustSignals::default(),
            mobile: MobileChecks::default(),
            schema: SchemaMarkup::default(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Largest contentful paint, measured on the mobile viewport.
    pub lcp_ms: Option<u64>,
    /// Cumulative layout shift, rounded to 4 decimals.
    pub cls: Option<f64>,
    pub ttfb_ms: Option<u64>,
    pub dom_content_loaded_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSummary {
    pub title: Option<String>,
    pub h1: Option<String>,
    pub meta_description: Option<String>,
    pub word_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionSignals {
    pub cta_above_fold: bool,
    pub form_present: bool,
    pub form_fields: usize,
    pub phone_number: bool,
    pub chat_widget: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustSignals {
    pub testimonials: bool,
    pub trust_badges: bool,
    pub reviews_schema: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileChecks {
    pub viewport_meta: bool,
    pub horizontal_scroll: bool,
    pub font_readable: bool,
}

impl Default for MobileChecks {
    fn default() -> Self {
        Self {
            viewport_meta: false,
            horizontal_scroll: false,
            // Readable until measured otherwise.
            font_readable: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaMarkup {
    pub types_found: Vec<String>,
    pub product_schema: bool,
    pub faq_schema: bool,
    pub service_schema: bool,
}

/// Validate the URL, launch the driver and run both analysis passes.
pub async fn analyze_landing(session: &Arc<Session>, raw_url: &str) -> LandingReport {
    let mut report = LandingReport::new(raw_url);

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

    analyze_on(&page, &gate, &validated, &mut report).await;
    let _ = page.close().await;
    report
}

async fn analyze_on(
    page: &dyn Page,
    gate: &RequestGate,
    url: &ValidatedUrl,
    report: &mut LandingReport,
) {
    if let Err(e) = desktop_pass(page, gate, url, report).await {
        report.error = Some(e.to_string());
        return;
    }
    // A failed mobile pass keeps everything the desktop pass measured.
    if let Err(e) = mobile_pass(page, gate, url, report).await {
        report.error = Some(e.to_string());
    }
}

async fn desktop_pass(
    page: &dyn Page,
    gate: &RequestGate,
    url: &ValidatedUrl,
    report: &mut LandingReport,
) -> Result<(), AnalysisError> {
    let config = gate.session().config();
    page.set_viewport(config.viewports.desktop).await?;
    page.navigate(url.as_str(), config.wait, config.browser_timeout())
        .await?;
    gate.revalidate_final_url(&page.current_url().await?).await?;

    let timing = page.eval(js::NAV_TIMING).await?;
    report.performance.ttfb_ms = timing.get("ttfb").and_then(positive_ms);
    report.performance.dom_content_loaded_ms =
        timing.get("domContentLoaded").and_then(positive_ms);

    let cls = page.eval(js::CUMULATIVE_LAYOUT_SHIFT).await?;
    report.performance.cls = cls.as_f64().map(|v| (v * 10_000.0).round() / 10_000.0);

    report.content.title = Some(page.title().await?);
    if let Some(h1) = page.query("h1").await? {
        report.content.h1 = Some(h1.text.trim().to_string());
    }
    if let Some(meta) = page.query(r#"meta[name="description"]"#).await? {
        report.content.meta_description = meta.attr("content").map(str::to_string);
    }
    report.content.word_count = page.eval(js::WORD_COUNT).await?.as_u64().unwrap_or(0);

    let fold = f64::from(config.viewports.desktop.height);
    for selector in CTA_SELECTORS {
        if let Some(cta) = page.query(selector).await? {
            if cta.above_fold(fold) {
                report.conversion.cta_above_fold = true;
                break;
            }
        }
    }

    if !page.query_all("form").await?.is_empty() {
        report.conversion.form_present = true;
        report.conversion.form_fields = page.query_all(FORM_FIELDS_SELECTOR).await?.len();
    }

    report.conversion.phone_number = page.query("a[href^='tel:']").await?.is_some();

    for selector in CHAT_SELECTORS {
        if page.query(selector).await?.is_some() {
            report.conversion.chat_widget = true;
            break;
        }
    }

    if let Some(text) = page.eval(js::PAGE_TEXT).await?.as_str() {
        report.trust.testimonials = TESTIMONIAL_KEYWORDS.iter().any(|k| text.contains(k));
        report.trust.trust_badges = TRUST_BADGE_KEYWORDS.iter().any(|k| text.contains(k));
    }

    let types = schema_types(page.eval(js::SCHEMA_TYPES).await?);
    report.schema.product_schema = types.iter().any(|t| t == "Product");
    report.schema.faq_schema = types.iter().any(|t| t == "FAQPage");
    report.schema.service_schema = types.iter().any(|t| t == "Service");
    report.trust.reviews_schema = types.iter().any(|t| t == "Review" || t == "AggregateRating");
    report.schema.types_found = types;

    Ok(())
}

async fn mobile_pass(
    page: &dyn Page,
    gate: &RequestGate,
    url: &ValidatedUrl,
    report: &mut LandingReport,
) -> Result<(), AnalysisError> {
    let config = gate.session().config();
    page.set_viewport(config.viewports.mobile).await?;
    page.navigate(url.as_str(), config.wait, config.browser_timeout())
        .await?;
    gate.revalidate_final_url(&page.current_url().await?).await?;

    let lcp = page.eval(js::LARGEST_CONTENTFUL_PAINT).await?;
    report.performance.lcp_ms = positive_ms(&lcp);

    report.mobile.viewport_meta = page.query(r#"meta[name="viewport"]"#).await?.is_some();

    let scroll_width = page.eval(js::SCROLL_WIDTH).await?.as_f64();
    let inner_width = page.eval(js::INNER_WIDTH).await?.as_f64();
    if let (Some(scroll), Some(inner)) = (scroll_width, inner_width) {
        report.mobile.horizontal_scroll = scroll > inner;
    }

    if let Some(size) = page.eval(js::BASE_FONT_SIZE).await?.as_f64() {
        report.mobile.font_readable = size >= 16.0;
    }

    Ok(())
}

/// A timing value as whole milliseconds, dropping null and zero samples
/// (a zero navigation entry means the metric was never captured).
fn positive_ms(value: &Value) -> Option<u64> {
    let ms = value.as_f64()?;
    (ms > 0.0).then(|| ms.round() as u64)
}

/// Flatten JSON-LD @type values: a type can be a string or a list.
fn schema_types(value: Value) -> Vec<String> {
    let Value::Array(raw) = value else {
        return Vec::new();
    };
    let mut types = Vec::new();
    for entry in raw {
        match entry {
            Value::String(s) => types.push(s),
            Value::Array(inner) => types.extend(
                inner
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string)),
            ),
            _ => {}
        }
    }
    types
}

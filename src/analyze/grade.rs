//! Grading over a landing-page report.
//!
//! Thresholds follow the Core Web Vitals bands for LCP and common
//! lead-gen guidance for form length; everything else is a presence
//! check on the report.

use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analyze::landing::LandingReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    Pass,
    Warning,
    Fail,
}

impl Grade {
    /// Pass iff the condition holds.
    fn check(ok: bool) -> Grade {
        if ok {
            Grade::Pass
        } else {
            Grade::Fail
        }
    }

    pub fn colorized(&self) -> ColoredString {
        match self {
            Grade::Pass => "PASS".green(),
            Grade::Warning => "WARNING".yellow(),
            Grade::Fail => "FAIL".red(),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Pass => write!(f, "PASS"),
            Grade::Warning => write!(f, "WARNING"),
            Grade::Fail => write!(f, "FAIL"),
        }
    }
}

/// The per-check grades for one landing-page report. Checks that did not
/// apply (no LCP sample, no form on the page) carry no grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingGrades {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_speed: Option<Grade>,
    pub relevance: Grade,
    pub schema: Grade,
    pub cta_above_fold: Grade,
    pub mobile_responsive: Grade,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_friction: Option<Grade>,
}

impl LandingGrades {
    /// The grades that apply, in report order, for text output.
    pub fn entries(&self) -> Vec<(&'static str, Grade)> {
        let mut entries = Vec::new();
        if let Some(grade) = self.mobile_speed {
            entries.push(("mobile_speed", grade));
        }
        entries.push(("relevance", self.relevance));
        entries.push(("schema", self.schema));
        entries.push(("cta_above_fold", self.cta_above_fold));
        entries.push(("mobile_responsive", self.mobile_responsive));
        if let Some(grade) = self.form_friction {
            entries.push(("form_friction", grade));
        }
        entries
    }
}

/// Grade a landing-page report.
pub fn grade_landing(report: &LandingReport) -> LandingGrades {
    let mobile_speed = report.performance.lcp_ms.map(|lcp| {
        if lcp < 2500 {
            Grade::Pass
        } else if lcp < 4000 {
            Grade::Warning
        } else {
            Grade::Fail
        }
    });

    let has_h1 = report
        .content
        .h1
        .as_deref()
        .map_or(false, |h1| !h1.is_empty());

    let has_relevant_schema = report.schema.product_schema
        || report.schema.faq_schema
        || report.schema.service_schema;

    let form_friction = report.conversion.form_present.then(|| {
        let fields = report.conversion.form_fields;
        if fields <= 5 {
            Grade::Pass
        } else if fields <= 8 {
            Grade::Warning
        } else {
            Grade::Fail
        }
    });

    LandingGrades {
        mobile_speed,
        relevance: Grade::check(has_h1),
        schema: Grade::check(has_relevant_schema),
        cta_above_fold: Grade::check(report.conversion.cta_above_fold),
        mobile_responsive: Grade::check(
            report.mobile.viewport_meta && !report.mobile.horizontal_scroll,
        ),
        form_friction,
    }
}

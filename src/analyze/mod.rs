//! Page analysis tools built on the driven browser: landing-page quality
//! auditing and visual/layout checks, plus the grading applied on top.

pub mod grade;
pub(crate) mod js;
pub mod landing;
pub mod visual;

pub use grade::{grade_landing, Grade, LandingGrades};
pub use landing::{analyze_landing, LandingReport};
pub use visual::{analyze_visual, VisualReport};

use thiserror::Error;

use crate::browser::EngineError;
use crate::guard::GuardError;

/// A failure while driving a pass: either the engine broke or the guard
/// refused the page. Both end up in the report's `error` field.
#[derive(Debug, Error)]
pub(crate) enum AnalysisError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Guard(#[from] GuardError),
}

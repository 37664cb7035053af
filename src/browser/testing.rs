//! A scripted [`Page`] for exercising the analysis tools without a
//! browser. Canned answers are keyed by the exact JS or selector the
//! tool sends; anything unscripted evaluates to null or matches nothing,
//! which is what a page missing that content looks like.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::browser::page::{ElementInfo, EngineError, Page};
use crate::config::{Viewport, WaitUntil};

#[derive(Default)]
pub struct ScriptedPage {
    title: String,
    final_url: StdMutex<String>,
    evals: HashMap<String, Value>,
    evals_at: HashMap<(u32, String), Value>,
    elements: HashMap<String, Vec<ElementInfo>>,
    nav_outcomes: StdMutex<VecDeque<Result<(), EngineError>>>,
    current_width: StdMutex<u32>,
    navigations: StdMutex<Vec<String>>,
    viewports: StdMutex<Vec<Viewport>>,
    screenshots: StdMutex<Vec<(PathBuf, bool)>>,
}

impl ScriptedPage {
    pub fn new(final_url: impl Into<String>) -> Self {
        Self {
            final_url: StdMutex::new(final_url.into()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Answer `js` with `value` in every viewport.
    pub fn with_eval(mut self, js: impl Into<String>, value: Value) -> Self {
        self.evals.insert(js.into(), value);
        self
    }

    /// Answer `js` with `value` only when the viewport is `width` wide.
    pub fn with_eval_at(mut self, width: u32, js: impl Into<String>, value: Value) -> Self {
        self.evals_at.insert((width, js.into()), value);
        self
    }

    pub fn with_element(self, selector: impl Into<String>, element: ElementInfo) -> Self {
        self.with_elements(selector, vec![element])
    }

    pub fn with_elements(
        mut self,
        selector: impl Into<String>,
        elements: Vec<ElementInfo>,
    ) -> Self {
        self.elements.insert(selector.into(), elements);
        self
    }

    /// Script the outcome of the next unscripted navigation (consumed in
    /// order; navigations beyond the script succeed).
    pub fn with_nav_outcome(self, outcome: Result<(), EngineError>) -> Self {
        self.nav_outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn viewports(&self) -> Vec<Viewport> {
        self.viewports.lock().unwrap().clone()
    }

    pub fn screenshots(&self) -> Vec<(PathBuf, bool)> {
        self.screenshots.lock().unwrap().clone()
    }

    /// Point `current_url` somewhere new, as a driver-side redirect would.
    pub fn set_final_url(&self, url: impl Into<String>) {
        *self.final_url.lock().unwrap() = url.into();
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn set_viewport(&self, viewport: Viewport) -> Result<(), EngineError> {
        *self.current_width.lock().unwrap() = viewport.width;
        self.viewports.lock().unwrap().push(viewport);
        Ok(())
    }

    async fn navigate(
        &self,
        url: &str,
        _wait: WaitUntil,
        _timeout: Duration,
    ) -> Result<(), EngineError> {
        self.navigations.lock().unwrap().push(url.to_string());
        match self.nav_outcomes.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok(()),
        }
    }

    async fn current_url(&self) -> Result<String, EngineError> {
        Ok(self.final_url.lock().unwrap().clone())
    }

    async fn title(&self) -> Result<String, EngineError> {
        Ok(self.title.clone())
    }

    async fn eval(&self, js: &str) -> Result<Value, EngineError> {
        let width = *self.current_width.lock().unwrap();
        if let Some(value) = self.evals_at.get(&(width, js.to_string())) {
            return Ok(value.clone());
        }
        Ok(self.evals.get(js).cloned().unwrap_or(Value::Null))
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementInfo>, EngineError> {
        Ok(self
            .elements
            .get(selector)
            .and_then(|matches| matches.first())
            .cloned())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementInfo>, EngineError> {
        Ok(self.elements.get(selector).cloned().unwrap_or_default())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), EngineError> {
        // Leave a stub file behind so callers can check the capture landed.
        std::fs::write(path, b"PNG").map_err(|e| EngineError::Driver(e.to_string()))?;
        self.screenshots
            .lock()
            .unwrap()
            .push((path.to_path_buf(), full_page));
        Ok(())
    }

    async fn settle(&self, _duration: Duration) -> Result<(), EngineError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

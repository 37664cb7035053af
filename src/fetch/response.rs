//! The terminal response of a guarded fetch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a fetch produced once redirects settled.
///
/// Serializes to the JSON shape the `fetch --json` command prints, so the
/// fields read like the output: final URL, status, headers, body, and the
/// chain of redirect targets that led here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResponse {
    /// URL of the terminal response, after any redirects.
    pub url: String,

    pub status_code: u16,

    /// Response headers, keys lowercased. Repeated headers are joined
    /// with ", ".
    pub headers: BTreeMap<String, String>,

    /// Decoded response body.
    pub content: String,

    /// Every redirect target that was followed, in hop order. Empty when
    /// the first response was terminal.
    pub redirect_chain: Vec<String>,
}

impl FinalResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

//! PageWarden — SSRF-guarded page fetching, auditing and screenshots.
//!
//! This library exposes the guard pipeline and the scan tools for
//! integration testing and programmatic use. The binary entrypoint is in
//! `main.rs`.
//!
//! The core promise: no command connects anywhere the guard has not
//! cleared. A URL is validated before navigation, every redirect hop is
//! validated before it is followed, every request a rendered page makes
//! is held until cleared, and the final landing URL is re-checked.

pub mod analyze;
pub mod audit;
pub mod browser;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod guard;
pub mod session;
pub mod shot;

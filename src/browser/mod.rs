//! Driven-browser integration: the driver subprocess, the page surface
//! the tools program against, and the request gate that rules on every
//! URL a rendered page tries to load.

pub mod driver;
pub mod gate;
pub mod page;
pub mod protocol;

#[cfg(test)]
pub mod testing;

pub use driver::DriverPage;
pub use gate::{GateDecision, RequestGate};
pub use page::{ElementInfo, EngineError, Page};

pub mod logger;
pub mod reader;
pub mod types;

pub use logger::DecisionLogger;
pub use reader::DecisionReader;
pub use types::*;

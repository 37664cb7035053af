pub mod defaults;
pub mod parser;
pub mod types;

pub use parser::{discover_config_path, load_config, parse_config_file, parse_config_str};
pub use types::*;

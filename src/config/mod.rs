//! Configuration loading: sources, section parsing and reference resolution.

mod builder;
mod env;
mod error;
mod file;
mod flat;
mod parser;
mod properties;
mod resolve;
mod source;

pub use builder::{load_str, Config};
pub use env::{env_entries, CONTEXT_VAR, FILE_VAR};
pub use error::ConfigError;
pub use file::FileSource;
pub use parser::{merge_contexts, parse_sections, parse_source, parse_str, DEFAULT_CONTEXT};
pub use properties::Properties;
pub use resolve::{reference_target, resolve_references};
pub use source::{ConfigSource, StreamSource};

use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for the ctxconf library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("unable to find configuration value for key [{0}]")]
    MissingKey(String),

    #[error("configuration value [{key}] is not a parsable {expected}")]
    NotParsable { key: String, expected: &'static str },

    #[error("invalid list separator pattern '{separator}': {source}")]
    InvalidSeparator {
        separator: String,
        source: regex::Error,
    },

    #[error("configuration store requires a loader")]
    MissingLoader,
}

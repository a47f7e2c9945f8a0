use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read config stream: {0}")]
    StreamError(#[source] std::io::Error),

    #[error("unparsable line {line}: [{content}]")]
    MalformedLine { line: usize, content: String },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),
}

impl ConfigError {
    /// Returns `true` if the underlying source could not be read.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_) | Self::ReadError { .. } | Self::StreamError(_)
        )
    }
}

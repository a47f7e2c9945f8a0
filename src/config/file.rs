//! File-based configuration source.

use std::path::{Path, PathBuf};

use super::source::ConfigSource;
use super::ConfigError;

/// A configuration source that reads a UTF-8 text file.
///
/// Files can be marked as required or optional. Required files that don't exist
/// cause an error; optional files that don't exist load as an absent source.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    /// Creates a new file source.
    ///
    /// If `required` is true, loading fails if the file doesn't exist.
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn read_to_string(&self) -> Result<Option<String>, ConfigError> {
        read_config_file(&self.path, self.required)
    }

    fn location(&self) -> Option<String> {
        Some(self.path.display().to_string())
    }
}

/// Reads a config file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn read_config_file(path: &Path, required: bool) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

//! Raw configuration text providers.

use std::fmt;
use std::io::{self, Read};

use parking_lot::Mutex;

use super::ConfigError;

/// Supplies the raw text of a configuration document.
///
/// A source that returns `Ok(None)` is absent: it contributes no lines and
/// loads as an empty mapping rather than failing.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Reads the complete document.
    fn read_to_string(&self) -> Result<Option<String>, ConfigError>;

    /// Human-readable location of the source, if it has one.
    fn location(&self) -> Option<String> {
        None
    }

    /// Reads the document as an ordered sequence of lines.
    fn lines(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self
            .read_to_string()?
            .map(|text| text.lines().map(str::to_owned).collect())
            .unwrap_or_default())
    }
}

impl<S: ConfigSource> ConfigSource for Option<S> {
    fn read_to_string(&self) -> Result<Option<String>, ConfigError> {
        match self {
            Some(source) => source.read_to_string(),
            None => Ok(None),
        }
    }

    fn location(&self) -> Option<String> {
        self.as_ref().and_then(ConfigSource::location)
    }
}

enum StreamState {
    Pending(Box<dyn Read + Send>),
    Buffered(Vec<u8>),
}

/// A configuration source backed by a byte stream or an in-memory buffer.
///
/// The stream is drained on first read and the bytes are kept, so the
/// source can be read again when the configuration is reloaded.
pub struct StreamSource {
    state: Mutex<StreamState>,
}

impl StreamSource {
    /// Wraps a reader. Nothing is read until the source is first loaded.
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            state: Mutex::new(StreamState::Pending(Box::new(reader))),
        }
    }

    /// Creates a source over bytes already in memory.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            state: Mutex::new(StreamState::Buffered(bytes.into())),
        }
    }
}

impl From<String> for StreamSource {
    fn from(text: String) -> Self {
        Self::from_bytes(text)
    }
}

impl From<&str> for StreamSource {
    fn from(text: &str) -> Self {
        Self::from_bytes(text)
    }
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            StreamState::Pending(_) => "pending".to_string(),
            StreamState::Buffered(bytes) => format!("{} bytes", bytes.len()),
        };
        f.debug_struct("StreamSource").field("state", &state).finish()
    }
}

impl ConfigSource for StreamSource {
    fn read_to_string(&self) -> Result<Option<String>, ConfigError> {
        let mut state = self.state.lock();
        if let StreamState::Pending(reader) = &mut *state {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(ConfigError::StreamError)?;
            *state = StreamState::Buffered(buf);
        }

        match &*state {
            StreamState::Buffered(bytes) => String::from_utf8(bytes.clone())
                .map(Some)
                .map_err(|e| {
                    ConfigError::StreamError(io::Error::new(io::ErrorKind::InvalidData, e))
                }),
            StreamState::Pending(_) => Ok(None),
        }
    }
}

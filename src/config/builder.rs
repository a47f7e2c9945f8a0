use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::env::{CONTEXT_VAR, FILE_VAR};
use super::file::FileSource;
use super::parser::{parse_source, parse_str};
use super::resolve::resolve_references;
use super::source::{ConfigSource, StreamSource};
use super::{ConfigError, Properties};

/// Builder for loading sectioned configuration documents.
///
/// Each source is parsed on its own: its default section is merged with the
/// section named by [`with_context`](Self::with_context), and sources are
/// then layered in registration order, later sources overriding earlier ones.
///
/// ## Format
///
/// ```text
/// [Default]
/// host = localhost        # trailing comments are stripped
/// url = http://localhost/api?user=admin
/// endpoint = ${url}
///
/// [Production]
/// host = example.com
/// ```
///
/// A value that is exactly `${key}` is replaced by the resolved value of
/// `key` once all sources are merged. References that form a cycle or name a
/// missing key are left as written.
///
/// A document without any `[...]` header is read as a flat properties file
/// and the context is ignored for it.
///
/// ## Example
///
/// ```no_run
/// use ctxconf::Config;
///
/// let props = Config::builder()
///     .with_file("config/app.cfg", true)
///     .with_file("config/local.cfg", false)
///     .with_context("Production")
///     .load()?;
///
/// let host = props.get("host");
/// # Ok::<(), ctxconf::ConfigError>(())
/// ```
///
/// The builder is not consumed by [`load`](Self::load), so the same pipeline
/// can be re-run to pick up changes.
#[derive(Debug, Clone, Default)]
#[must_use = "builders do nothing until .load() is called"]
pub struct Config {
    sources: Vec<Arc<dyn ConfigSource>>,
    context: Option<String>,
}

impl Config {
    /// Creates a new configuration builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Creates a builder from the `CONF_PROPERTIES` and `CONF_CONTEXT`
    /// environment variables.
    ///
    /// Without `CONF_PROPERTIES` the builder has no source and loads empty.
    pub fn from_env() -> Self {
        let mut config = Self::builder();
        if let Ok(path) = std::env::var(FILE_VAR) {
            config = config.with_file(path, true);
        }
        if let Ok(context) = std::env::var(CONTEXT_VAR) {
            config = config.with_context(context);
        }
        config
    }

    /// Adds any configuration source.
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Adds a configuration file to be loaded.
    ///
    /// If `required` is `true`, loading fails if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Adds a byte stream. It is drained on the first load and kept for reloads.
    pub fn with_reader(self, reader: impl Read + Send + 'static) -> Self {
        self.with_source(StreamSource::new(reader))
    }

    /// Adds in-memory configuration text.
    pub fn with_str(self, text: impl Into<String>) -> Self {
        self.with_source(StreamSource::from(text.into()))
    }

    /// Selects the section merged over `[Default]`.
    ///
    /// Matching is case-insensitive. A name that matches no header is not an
    /// error; only the default section is loaded.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Location of the highest-precedence source that has one.
    pub fn location(&self) -> Option<String> {
        self.sources.iter().rev().find_map(|source| source.location())
    }

    /// Loads, merges and resolves every source.
    ///
    /// Fails on the first unreadable source or malformed line; nothing is
    /// returned in that case.
    pub fn load(&self) -> Result<Properties, ConfigError> {
        let mut merged = BTreeMap::new();

        for source in &self.sources {
            debug!(?source, context = ?self.context, "loading configuration source");
            merged.extend(parse_source(source.as_ref(), self.context.as_deref())?);
        }

        // Resolve ${...} references after all sources are merged
        resolve_references(&mut merged);

        Ok(merged.into())
    }
}

/// Parses and resolves a single document held in memory.
pub fn load_str(text: &str, context: Option<&str>) -> Result<Properties, ConfigError> {
    let mut mapping = parse_str(text, context)?;
    resolve_references(&mut mapping);
    Ok(mapping.into())
}

//! Shared configuration store with typed accessors.

use std::collections::BTreeMap;
use std::fmt::Display;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use tracing::info;

use crate::config::{env_entries, Config, Properties};
use crate::Error;

/// Key under which the store records the location of its configuration file.
pub const SOURCE_KEY: &str = "conf.properties";

/// Key under which the store records the selected context.
pub const CONTEXT_KEY: &str = "conf.context";

static ITEM_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\,").expect("valid item separator regex"));

/// Conversion from a stored string value.
pub trait FromValue: Sized {
    /// Name used in [`Error::NotParsable`].
    const TYPE_NAME: &'static str;

    fn from_value(value: &str) -> Option<Self>;
}

macro_rules! impl_from_value_via_parse {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_value(value: &str) -> Option<Self> {
                    value.parse().ok()
                }
            }
        )*
    };
}

impl_from_value_via_parse! {
    i8 => "byte",
    u8 => "unsigned byte",
    i16 => "short",
    u16 => "unsigned short",
    i32 => "int",
    u32 => "unsigned int",
    i64 => "long",
    u64 => "unsigned long",
    usize => "size",
    f32 => "float",
    f64 => "double",
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_value(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("true") {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

impl FromValue for char {
    const TYPE_NAME: &'static str = "char";

    /// Takes the first character of the value.
    fn from_value(value: &str) -> Option<Self> {
        value.chars().next()
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: &str) -> Option<Self> {
        Some(value.to_string())
    }
}

/// A mutable configuration store shared between threads.
///
/// The store starts from its seed entries (bookkeeping keys, environment
/// entries, explicit entries) and overlays the mapping produced by its
/// [`Config`]. All reads and writes go through one lock; [`reset`](Self::reset)
/// swaps the whole mapping at once, so readers never observe a partially
/// reloaded state.
///
/// ## Example
///
/// ```no_run
/// use ctxconf::{Config, Configuration};
///
/// let store = Configuration::new(
///     Config::builder()
///         .with_file("app.cfg", true)
///         .with_context("Production"),
/// )?;
///
/// let port: u16 = store.get("port")?;
/// let workers: usize = store.get_or("workers", 4)?;
/// let hosts: Vec<String> = store.get_list("hosts")?;
/// # Ok::<(), ctxconf::Error>(())
/// ```
#[derive(Debug)]
pub struct Configuration {
    loader: Config,
    initial: BTreeMap<String, String>,
    entries: Mutex<BTreeMap<String, String>>,
}

impl Configuration {
    /// Creates a new builder for constructing a `Configuration`.
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder {
            loader: None,
            initial: BTreeMap::new(),
        }
    }

    /// Loads a store from `loader` with no extra seed entries.
    pub fn new(loader: Config) -> Result<Self, Error> {
        Self::builder().with_loader(loader).build()
    }

    /// Loads a store from the `CONF_PROPERTIES` and `CONF_CONTEXT` environment
    /// variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(Config::from_env())
    }

    /// Returns the value for `key` converted to `T`.
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T, Error> {
        let value = self
            .lookup(key)
            .ok_or_else(|| Error::MissingKey(key.to_string()))?;
        parse_value(key, &value)
    }

    /// Returns the value for `key` converted to `T`, or `default` if the key
    /// is absent. A present but malformed value is still an error.
    pub fn get_or<T: FromValue>(&self, key: &str, default: T) -> Result<T, Error> {
        match self.lookup(key) {
            Some(value) => parse_value(key, &value),
            None => Ok(default),
        }
    }

    /// Splits the value for `key` on `,` and converts each trimmed part.
    pub fn get_list<T: FromValue>(&self, key: &str) -> Result<Vec<T>, Error> {
        self.split_and_parse(key, &ITEM_SEPARATOR)
    }

    /// Splits the value for `key` on the `separator` regular expression and
    /// converts each trimmed part.
    ///
    /// Trailing empty parts are dropped, but an empty value is one empty part,
    /// so it converts to `[""]` as a string list and fails for numbers.
    pub fn get_list_with<T: FromValue>(&self, key: &str, separator: &str) -> Result<Vec<T>, Error> {
        let separator = Regex::new(separator).map_err(|source| Error::InvalidSeparator {
            separator: separator.to_string(),
            source,
        })?;
        self.split_and_parse(key, &separator)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Returns all keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Copies the current entries.
    pub fn snapshot(&self) -> Properties {
        self.entries.lock().clone().into()
    }

    /// Stores the string form of `value` under `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Display) {
        let key = key.into();
        let value = value.to_string();
        info!(key = %key, value = %value, "set configuration property");
        self.entries.lock().insert(key, value);
    }

    /// Stores every entry under a single lock.
    pub fn set_all<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Display,
    {
        let mut guard = self.entries.lock();
        for (key, value) in entries {
            let key = key.into();
            let value = value.to_string();
            info!(key = %key, value = %value, "set configuration property");
            guard.insert(key, value);
        }
    }

    /// Removes `key`, returning its previous value.
    pub fn clear(&self, key: &str) -> Option<String> {
        let previous = self.entries.lock().remove(key);
        info!(key, "unset configuration property");
        previous
    }

    /// Restores the seed entries and reloads the configuration sources.
    ///
    /// Values written with [`set`](Self::set) are discarded. If reloading
    /// fails the store is left untouched and the error is returned.
    pub fn reset(&self) -> Result<(), Error> {
        let loaded = self.loader.load()?;

        let mut entries = self.entries.lock();
        entries.clear();
        entries.extend(self.initial.clone());
        entries.extend(loaded);
        drop(entries);

        info!("configuration properties have been reset");
        Ok(())
    }

    fn split_and_parse<T: FromValue>(&self, key: &str, separator: &Regex) -> Result<Vec<T>, Error> {
        let value = self
            .lookup(key)
            .ok_or_else(|| Error::MissingKey(key.to_string()))?;
        split_list(&value, separator)
            .into_iter()
            .map(|part| parse_value(key, part.trim()))
            .collect()
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

fn parse_value<T: FromValue>(key: &str, value: &str) -> Result<T, Error> {
    T::from_value(value).ok_or_else(|| Error::NotParsable {
        key: key.to_string(),
        expected: T::TYPE_NAME,
    })
}

fn split_list<'a>(value: &'a str, separator: &Regex) -> Vec<&'a str> {
    if value.is_empty() {
        return vec![value];
    }
    let mut parts: Vec<&str> = separator.split(value).collect();
    while parts.last().is_some_and(|part| part.is_empty()) {
        parts.pop();
    }
    parts
}

/// Builder for constructing a [`Configuration`].
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ConfigurationBuilder {
    loader: Option<Config>,
    initial: BTreeMap<String, String>,
}

impl ConfigurationBuilder {
    /// Sets the loader that produces the configuration mapping.
    pub fn with_loader(mut self, loader: Config) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Adds a seed entry. Loaded configuration overrides it.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.initial.insert(key.into(), value.to_string());
        self
    }

    /// Seeds entries from environment variables under `prefix`.
    ///
    /// The environment is read once, here; [`Configuration::reset`] restores
    /// these values rather than re-reading the environment.
    pub fn with_env(mut self, prefix: &str, separator: &str) -> Self {
        self.initial.extend(env_entries(prefix, separator));
        self
    }

    /// Loads the configuration and builds the store.
    ///
    /// Returns an error if no loader was provided or loading fails.
    pub fn build(self) -> Result<Configuration, Error> {
        let loader = self.loader.ok_or(Error::MissingLoader)?;
        let mut initial = self.initial;
        if let Some(location) = loader.location() {
            initial.insert(SOURCE_KEY.to_string(), location);
        }
        if let Some(context) = loader.context() {
            initial.insert(CONTEXT_KEY.to_string(), context.to_string());
        }

        info!("initializing configuration");
        let mut entries = initial.clone();
        entries.extend(loader.load()?);

        Ok(Configuration {
            loader,
            initial,
            entries: Mutex::new(entries),
        })
    }
}

//! The resolved key/value mapping produced by a load.

use std::collections::{btree_map, BTreeMap};

use serde::de::DeserializeOwned;
use toml::{Table, Value};

use super::ConfigError;

/// Resolved configuration entries, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.entries
    }

    /// Deserializes the entries into `T`.
    ///
    /// Dotted keys become nested tables (`db.port` is `port` inside `db`), and
    /// values that look like booleans, integers or floats are coerced before
    /// deserialization. When a key is both a value and a table prefix
    /// (`db` and `db.port`), the table wins.
    ///
    /// ## Example
    ///
    /// ```
    /// use ctxconf::Config;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Database {
    ///     host: String,
    ///     port: u16,
    /// }
    ///
    /// #[derive(Deserialize)]
    /// struct AppConfig {
    ///     db: Database,
    /// }
    ///
    /// let props = Config::builder()
    ///     .with_str("[Default]\ndb.host = localhost\ndb.port = 5432\n")
    ///     .load()?;
    /// let config: AppConfig = props.extract()?;
    /// assert_eq!(config.db.port, 5432);
    /// # Ok::<(), ctxconf::ConfigError>(())
    /// ```
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let mut table = Table::new();
        for (key, value) in &self.entries {
            let path: Vec<String> = key.split('.').map(str::to_string).collect();
            merge_at_path(&mut table, &path, coerce_value(value));
        }
        Value::Table(table)
            .try_into()
            .map_err(ConfigError::DeserializeError)
    }
}

impl From<BTreeMap<String, String>> for Properties {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Properties {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn merge_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        if !matches!(table.get(first), Some(Value::Table(_))) {
            table.insert(first.clone(), value);
        }
        return;
    }

    if !matches!(table.get(first), Some(Value::Table(_))) {
        table.insert(first.clone(), Value::Table(Table::new()));
    }

    if let Some(Value::Table(nested)) = table.get_mut(first) {
        merge_at_path(nested, rest, value);
    }
}

fn coerce_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }

    // Digits only, so "1e3" or "+5" stay text
    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

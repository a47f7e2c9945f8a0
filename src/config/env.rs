use std::collections::BTreeMap;

/// Environment variable naming the configuration file to load.
pub const FILE_VAR: &str = "CONF_PROPERTIES";

/// Environment variable naming the context to merge over the defaults.
pub const CONTEXT_VAR: &str = "CONF_CONTEXT";

/// Collects environment variables under `prefix` as configuration entries.
///
/// Variables are mapped to keys by:
/// 1. Removing the prefix and separator
/// 2. Splitting remaining segments on the separator
/// 3. Lowercasing the segments and joining them with `.`
///
/// With prefix `MYAPP` and separator `__`, `MYAPP__DB__HOST` becomes `db.host`.
pub fn env_entries(prefix: &str, separator: &str) -> BTreeMap<String, String> {
    entries_from(std::env::vars(), prefix, separator)
}

fn entries_from(
    vars: impl IntoIterator<Item = (String, String)>,
    prefix: &str,
    separator: &str,
) -> BTreeMap<String, String> {
    let prefix_with_sep = format!("{prefix}{separator}");
    let mut entries = BTreeMap::new();

    for (name, value) in vars {
        let Some(path) = name.strip_prefix(&prefix_with_sep) else {
            continue;
        };
        if path.is_empty() {
            continue;
        }

        let key = if separator.is_empty() {
            path.to_lowercase()
        } else {
            path.split(separator)
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(".")
        };
        entries.insert(key, value);
    }

    entries
}

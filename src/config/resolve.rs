//! Variable reference resolution for configuration values.
//!
//! A value that is exactly `${other.key}` stands for the resolved value of
//! `other.key`. Only whole-value references are substituted; `${` embedded in
//! a longer value is plain text.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

const LEFT_SUBSTITUTION: &str = "${";
const RIGHT_SUBSTITUTION: &str = "}";

/// Returns the referenced key if `value` is a whole-value `${key}` reference.
pub fn reference_target(value: &str) -> Option<&str> {
    value
        .strip_prefix(LEFT_SUBSTITUTION)?
        .strip_suffix(RIGHT_SUBSTITUTION)
}

/// Resolves all `${key}` references in the mapping.
///
/// Resolution proceeds in passes. In each pass a pending reference is
/// replaced only if its target exists and is not itself pending at the start
/// of the pass, so a chain of length `n` settles after `n` passes. Iteration
/// stops on the first pass that resolves nothing. References that are part of
/// a cycle or point at a missing key keep their literal `${...}` text.
///
/// Returns the number of references that were resolved.
pub fn resolve_references(mapping: &mut BTreeMap<String, String>) -> usize {
    let mut pending: BTreeMap<String, String> = mapping
        .iter()
        .filter_map(|(key, value)| {
            reference_target(value).map(|target| (key.clone(), target.to_string()))
        })
        .collect();
    let total = pending.len();
    let mut passes = 0;

    loop {
        let resolved: BTreeSet<String> = pending
            .iter()
            .filter(|(_, target)| mapping.contains_key(*target) && !pending.contains_key(*target))
            .map(|(key, _)| key.clone())
            .collect();
        if resolved.is_empty() {
            break;
        }
        passes += 1;

        for key in &resolved {
            if let Some(target) = pending.remove(key) {
                if let Some(value) = mapping.get(&target).cloned() {
                    mapping.insert(key.clone(), value);
                }
            }
        }
    }

    debug!(
        resolved = total - pending.len(),
        literal = pending.len(),
        passes,
        "resolved configuration references"
    );
    total - pending.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reference_target() {
        assert_eq!(reference_target("${key}"), Some("key"));
        assert_eq!(reference_target("${a.b}"), Some("a.b"));
        assert_eq!(reference_target("prefix ${key}"), None);
        assert_eq!(reference_target("${key} suffix"), None);
        assert_eq!(reference_target("$key"), None);
    }

    #[test]
    fn test_simple_reference() {
        let mut mapping = make_mapping(&[("key1", "value"), ("key2", "${key1}")]);
        let resolved = resolve_references(&mut mapping);

        assert_eq!(resolved, 1);
        assert_eq!(mapping["key1"], "value");
        assert_eq!(mapping["key2"], "value");
    }

    #[test]
    fn test_chained_references() {
        let mut mapping = make_mapping(&[
            ("key0", "0"),
            ("key1", "value"),
            ("random", "no"),
            ("key2", "${key1}"),
            ("key3", "${key2}"),
            ("key4", "${key0}"),
        ]);
        resolve_references(&mut mapping);

        assert_eq!(mapping.len(), 6);
        assert_eq!(mapping["key0"], "0");
        assert_eq!(mapping["random"], "no");
        assert_eq!(mapping["key2"], "value");
        assert_eq!(mapping["key3"], "value");
        assert_eq!(mapping["key4"], "0");
    }

    #[test]
    fn test_long_chain_resolves() {
        // a9 -> a8 -> ... -> a0 -> root, declared in reverse of resolution order
        let mut mapping = make_mapping(&[("root", "end")]);
        mapping.insert("a0".to_string(), "${root}".to_string());
        for i in 1..10 {
            mapping.insert(format!("a{i}"), format!("${{a{}}}", i - 1));
        }

        assert_eq!(resolve_references(&mut mapping), 10);
        for i in 0..10 {
            assert_eq!(mapping[&format!("a{i}")], "end");
        }
    }

    #[test]
    fn test_circular_reference() {
        let original = make_mapping(&[
            ("key1", "${key3}"),
            ("key2", "${key1}"),
            ("key3", "${key2}"),
        ]);
        let mut mapping = original.clone();

        assert_eq!(resolve_references(&mut mapping), 0);
        assert_eq!(mapping, original);
    }

    #[test]
    fn test_self_reference() {
        let mut mapping = make_mapping(&[("a", "${a}")]);
        resolve_references(&mut mapping);

        assert_eq!(mapping["a"], "${a}");
    }

    #[test]
    fn test_missing_reference() {
        let mut mapping = make_mapping(&[("key3", "${key2}"), ("key4", "${key0}"), ("key2", "v")]);
        resolve_references(&mut mapping);

        assert_eq!(mapping["key3"], "v");
        assert_eq!(mapping["key4"], "${key0}");
    }

    #[test]
    fn test_reference_into_cycle_stays_literal() {
        let mut mapping = make_mapping(&[("a", "${b}"), ("b", "${a}"), ("c", "${a}")]);
        resolve_references(&mut mapping);

        assert_eq!(mapping["c"], "${a}");
    }

    #[test]
    fn test_embedded_reference_is_plain_text() {
        let mut mapping = make_mapping(&[("host", "localhost"), ("url", "http://${host}/api")]);
        resolve_references(&mut mapping);

        assert_eq!(mapping["url"], "http://${host}/api");
    }

    #[test]
    fn test_resolved_value_may_look_like_reference() {
        // key1's literal text is a reference that can never resolve; key2 copies it
        // only once key1 is no longer pending, which never happens.
        let mut mapping = make_mapping(&[("key1", "${missing}"), ("key2", "${key1}")]);
        resolve_references(&mut mapping);

        assert_eq!(mapping["key1"], "${missing}");
        assert_eq!(mapping["key2"], "${key1}");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut mapping = make_mapping(&[
            ("a", "1"),
            ("b", "${a}"),
            ("c", "${b}"),
            ("x", "${y}"),
            ("y", "${x}"),
        ]);
        resolve_references(&mut mapping);
        let once = mapping.clone();
        resolve_references(&mut mapping);

        assert_eq!(mapping, once);
    }
}

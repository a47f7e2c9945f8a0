//! Section-aware parsing of configuration text.
//!
//! A document is a sequence of `key = value` lines grouped under `[Name]`
//! headers. Lines before the first header belong to the default section,
//! which may also be opened explicitly with `[Default]`. A document with no
//! header at all is read as a flat properties file instead.

use std::collections::BTreeMap;

use tracing::debug;

use super::flat;
use super::source::ConfigSource;
use super::ConfigError;

/// Name of the section that is always merged first.
pub const DEFAULT_CONTEXT: &str = "Default";

const COMMENT: char = '#';
const IDENTITY: char = '=';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Header(&'a str),
    Entry { number: usize, content: &'a str, raw: &'a str },
}

/// Parses a source into the merged (unresolved) mapping for `context`.
///
/// The source is read once; format detection and parsing see the same text.
pub fn parse_source(
    source: &dyn ConfigSource,
    context: Option<&str>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    match source.read_to_string()? {
        Some(text) => parse_str(&text, context),
        None => Ok(BTreeMap::new()),
    }
}

/// Parses in-memory text into the merged (unresolved) mapping for `context`.
pub fn parse_str(
    text: &str,
    context: Option<&str>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let lines: Vec<&str> = text.lines().collect();
    if is_flat(&lines) {
        debug!("no section headers found, reading flat properties");
        return Ok(flat::parse(text));
    }
    parse_sections(&lines, context)
}

/// Parses sectioned lines, merging the default section with `context`.
///
/// Only lines inside the default or the selected section are split into
/// pairs; a line without `=` there fails the whole parse. Lines of other
/// sections are never inspected beyond their headers.
pub fn parse_sections<S: AsRef<str>>(
    lines: &[S],
    context: Option<&str>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let classified: Vec<Line<'_>> = lines
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| classify(index + 1, raw.as_ref()))
        .collect();

    let defaults = collect_section(&classified, DEFAULT_CONTEXT, true)?;
    let named = match context {
        Some(name) => collect_section(&classified, name, false)?,
        None => BTreeMap::new(),
    };
    Ok(merge_contexts(defaults, named))
}

/// Overlays the named section onto the default section; the named section
/// wins on collision.
pub fn merge_contexts(
    mut defaults: BTreeMap<String, String>,
    named: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    defaults.extend(named);
    defaults
}

fn is_flat<S: AsRef<str>>(lines: &[S]) -> bool {
    !lines.is_empty()
        && !lines
            .iter()
            .any(|line| section_name(strip_comment(line.as_ref())).is_some())
}

fn strip_comment(raw: &str) -> &str {
    match raw.find(COMMENT) {
        Some(index) => raw[..index].trim(),
        None => raw.trim(),
    }
}

fn section_name(content: &str) -> Option<&str> {
    content.strip_prefix('[')?.strip_suffix(']')
}

fn classify(number: usize, raw: &str) -> Option<Line<'_>> {
    let content = strip_comment(raw);
    if content.is_empty() {
        return None;
    }
    match section_name(content) {
        Some(name) => Some(Line::Header(name)),
        None => Some(Line::Entry {
            number,
            content,
            raw,
        }),
    }
}

fn split_pair<'a>(
    number: usize,
    content: &'a str,
    raw: &str,
) -> Result<(&'a str, &'a str), ConfigError> {
    // Split on the first '=' only; values such as URLs carry their own.
    match content.split_once(IDENTITY) {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ConfigError::MalformedLine {
            line: number,
            content: raw.to_string(),
        }),
    }
}

/// Collects the pairs of every `[target]` section, later lines winning.
///
/// `implicit` opens the section at the start of the document.
fn collect_section(
    lines: &[Line<'_>],
    target: &str,
    implicit: bool,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let target = target.to_lowercase();
    let mut inside = implicit;
    let mut pairs = BTreeMap::new();

    for line in lines {
        match *line {
            Line::Header(name) => inside = name.to_lowercase() == target,
            Line::Entry {
                number,
                content,
                raw,
            } if inside => {
                let (key, value) = split_pair(number, content, raw)?;
                pairs.insert(key.to_string(), value.to_string());
            }
            Line::Entry { .. } => {}
        }
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doc(lines: &[&str]) -> String {
        lines.join("\n")
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_str("", None).unwrap().is_empty());
        assert!(parse_str("", Some("Test")).unwrap().is_empty());
    }

    #[test]
    fn test_default_section_only() {
        let text = doc(&[
            "[Default]",
            "somekey = somevalue",
            "newkey = newvalue # trailing comment",
        ]);
        let mapping = parse_str(&text, None).unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["somekey"], "somevalue");
        assert_eq!(mapping["newkey"], "newvalue");
    }

    #[test]
    fn test_both_contexts() {
        let text = doc(&[
            "[Default]",
            "somekey = somevalue",
            "newkey = newvalue",
            "[Test]",
            "test = 123",
        ]);
        let mapping = parse_str(&text, Some("Test")).unwrap();

        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping["test"], "123");
    }

    #[test]
    fn test_context_overrides_default() {
        let text = doc(&[
            "[Default]",
            "somekey = somevalue",
            "newkey = newvalue",
            "[Test]",
            "newkey = 123",
        ]);
        let mapping = parse_str(&text, Some("Test")).unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["somekey"], "somevalue");
        assert_eq!(mapping["newkey"], "123");
    }

    #[test]
    fn test_context_name_is_case_insensitive() {
        let text = doc(&["[default]", "a = 1", "[TEST]", "b = 2"]);
        let mapping = parse_str(&text, Some("Test")).unwrap();

        assert_eq!(mapping["a"], "1");
        assert_eq!(mapping["b"], "2");
    }

    #[test]
    fn test_missing_context_name_skips_named_sections() {
        let text = doc(&["[Default]", "a = 1", "[Test]", "b = 2"]);
        let mapping = parse_str(&text, None).unwrap();

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["a"], "1");
    }

    #[test]
    fn test_unknown_context_yields_defaults() {
        let text = doc(&["[Default]", "a = 1", "[Test]", "b = 2"]);
        let mapping = parse_str(&text, Some("Production")).unwrap();

        assert_eq!(mapping, parse_str(&text, None).unwrap());
    }

    #[test]
    fn test_lines_before_first_header_are_defaults() {
        let text = doc(&["a = 1", "[Test]", "b = 2", "[Default]", "c = 3"]);
        let mapping = parse_str(&text, Some("Test")).unwrap();

        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping["a"], "1");
        assert_eq!(mapping["c"], "3");
    }

    #[test]
    fn test_multi_context_read() {
        let text = doc(&[
            "[Default]",
            "key1 = value1",
            "[Test-2]",
            "key2 = value2",
            "[Test]",
            "key3 = value3",
            "[Test-3]",
            "key4 = value4",
        ]);
        let mapping = parse_str(&text, Some("Test")).unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["key1"], "value1");
        assert_eq!(mapping["key3"], "value3");
    }

    #[test]
    fn test_repeated_section_later_line_wins() {
        let text = doc(&["[Test]", "a = 1", "[Other]", "[Test]", "a = 2"]);
        let mapping = parse_str(&text, Some("test")).unwrap();

        assert_eq!(mapping["a"], "2");
    }

    #[test]
    fn test_value_keeps_inner_equals() {
        let url = "https://www.google.com/fp=dfc3525e9a3b356a&q=hello&safe=off/";
        let text = doc(&["[Default]", &format!("key = {url}"), "[Test]"]);
        let mapping = parse_str(&text, Some("Test")).unwrap();

        assert_eq!(mapping["key"], url);
    }

    #[test]
    fn test_empty_value_is_allowed() {
        let mapping = parse_str("[Default]\nkey =\n", None).unwrap();

        assert_eq!(mapping["key"], "");
    }

    #[test]
    fn test_unparsable_line() {
        let text = doc(&["[Default]", "key1 = value1", " ", "Somestuff #"]);
        let result = parse_str(&text, None);

        assert!(matches!(
            result,
            Err(ConfigError::MalformedLine { line: 4, ref content }) if content == "Somestuff #"
        ));
    }

    #[test]
    fn test_unparsable_line_in_unselected_section_is_skipped() {
        let text = doc(&["[Default]", "a = 1", "[Other]", "junk line"]);
        let mapping = parse_str(&text, None).unwrap();

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["a"], "1");
    }

    #[test]
    fn test_unparsable_line_in_selected_section() {
        let text = doc(&["[Default]", "a = 1", "[Other]", "junk line"]);
        let result = parse_str(&text, Some("other"));

        assert!(matches!(result, Err(ConfigError::MalformedLine { line: 4, .. })));
    }

    #[test]
    fn test_missing_key_is_unparsable() {
        let result = parse_str("[Default]\n= value\n", None);

        assert!(matches!(result, Err(ConfigError::MalformedLine { line: 2, .. })));
    }

    #[test]
    fn test_comment_lines_are_ignored() {
        let text = doc(&["# leading", "[Default]", "   # indented", "a = 1"]);
        let mapping = parse_str(&text, None).unwrap();

        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_flat_format_ignores_context() {
        let text = "key1=value1\n \nkey3=value3\n";
        let mapping = parse_str(text, Some("Test")).unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["key1"], "value1");
        assert_eq!(mapping["key3"], "value3");
    }

    #[test]
    fn test_parse_source_detects_flat_format() {
        let source = crate::config::StreamSource::from("a: 1\nb 2\n");
        let mapping = parse_source(&source, None).unwrap();

        assert_eq!(mapping["a"], "1");
        assert_eq!(mapping["b"], "2");
    }

    #[derive(Debug)]
    struct CountingSource {
        text: &'static str,
        reads: AtomicUsize,
    }

    impl ConfigSource for CountingSource {
        fn read_to_string(&self) -> Result<Option<String>, ConfigError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.text.to_string()))
        }
    }

    #[test]
    fn test_parse_source_reads_once() {
        for text in ["a = 1\nb = 2\n", "[Default]\na = 1\n"] {
            let source = CountingSource {
                text,
                reads: AtomicUsize::new(0),
            };
            let mapping = parse_source(&source, None).unwrap();

            assert_eq!(mapping["a"], "1");
            assert_eq!(source.reads.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_parse_source_absent_is_empty() {
        let source: Option<crate::config::StreamSource> = None;

        assert!(parse_source(&source, Some("Test")).unwrap().is_empty());
    }

    #[test]
    fn test_merge_contexts_named_wins() {
        let defaults = BTreeMap::from([("a".to_string(), "1".to_string())]);
        let named = BTreeMap::from([
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "3".to_string()),
        ]);
        let merged = merge_contexts(defaults, named);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged["a"], "2");
    }
}

//! Subject line parsing for Usenet binary posts.
//!
//! Posters describe multi-part files only through free-text subjects such as
//! `[001/034] - "My.Show.S01E01.mkv" yEnc`. This module extracts the file
//! name and the `index/total` part counter from those subjects.
//!
//! Parsing is layered:
//! 1. A composite pattern captures `parts` (`N/M`) and `name` (a quoted file
//!    stem followed by a known extension) as named groups.
//! 2. A captured `reqid` stands in for a missing name.
//! 3. Otherwise the name is synthesized from every non-empty captured value,
//!    ordered by capture-group name. A `name` group that matched but is empty
//!    is a parse failure, not a reason to synthesize.
//! 4. A missing part counter falls back to a generic delimited pattern
//!    (`N/M`, `N of M`, `N-M`, `N~M`).
//!
//! # Example
//!
//! ```
//! use indexer_core::subject::parse_subject;
//!
//! let parsed = parse_subject(r#"[001/034] - "My.Show.S01E01.mkv" yEnc"#).unwrap();
//! assert_eq!(parsed.name, "My.Show.S01E01");
//! assert_eq!(parsed.part_index, 1);
//! assert_eq!(parsed.total_parts, 34);
//! ```

mod error;

pub use error::SubjectError;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Part counter first, then a quoted file stem ending in a known extension.
#[allow(clippy::expect_used)]
static DEFAULT_SUBJECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i).*?(?P<parts>\d{1,3}/\d{1,3}).*?"(?P<name>.*?)\.(?:sample|mkv|avi|mp4|vol|ogm|par|rar|sfv|nfo|nzb|srt|ass|mpg|txt|zip|wmv|ssa|r\d{1,3}|7z|tar|mov|divx|m2ts|rmvb|iso|dmg|sub|idx|rm|ac3|t\d{1,2}|u\d{1,3})"#,
    )
    .expect("subject regex is valid") // Static pattern, safe to panic
});

/// Generic part counter enclosed by brackets, parentheses or spaces.
#[allow(clippy::expect_used)]
static PART_COUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[\[\( ]((\d{1,3}/\d{1,3})|(\d{1,3} of \d{1,3})|(\d{1,3}-\d{1,3})|(\d{1,3}~\d{1,3}))[\)\] ]",
    )
    .expect("part count regex is valid") // Static pattern, safe to panic
});

const NAME_GROUP: &str = "name";
const PARTS_GROUP: &str = "parts";
const REQID_GROUP: &str = "reqid";

/// Name and part counter extracted from one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSubject {
    /// File name without extension.
    pub name: String,
    /// 1-based position of this part (0 when posters count from zero).
    pub part_index: u32,
    /// Total parts announced for the binary.
    pub total_parts: u32,
    /// `total_parts` exactly as written in the subject; part of the binary hash.
    pub total_raw: String,
}

/// Subject parser with a configurable composite pattern.
///
/// The pattern may define any of the named groups `name`, `parts` and
/// `reqid`; other named groups only contribute to name synthesis.
#[derive(Debug, Clone)]
pub struct SubjectParser {
    pattern: Regex,
}

impl Default for SubjectParser {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_SUBJECT_PATTERN.clone(),
        }
    }
}

impl SubjectParser {
    /// Creates a parser using `pattern` in place of the default composite pattern.
    #[must_use]
    pub fn with_pattern(pattern: Regex) -> Self {
        Self { pattern }
    }

    /// Parses one subject line.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError::NoNameOrParts`] when a name or part counter
    /// cannot be determined, [`SubjectError::MissingSeparator`] when the part
    /// counter cannot be normalized to `N/M`, and
    /// [`SubjectError::InvalidPartCount`] when either side is not an integer.
    pub fn parse(&self, subject: &str) -> Result<ParsedSubject, SubjectError> {
        let fields = self.named_captures(subject);

        // A `name` group that matched nothing (`".mkv"`) is not replaced.
        let name = match fields.get(NAME_GROUP) {
            Some(name) => name.clone(),
            None => match fields.get(REQID_GROUP).filter(|reqid| !reqid.is_empty()) {
                Some(reqid) => reqid.clone(),
                None => synthesize_name(&fields),
            },
        };

        let parts = fields.get(PARTS_GROUP).filter(|p| !p.is_empty()).cloned().or_else(|| {
            PART_COUNT_PATTERN
                .captures(subject)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        });

        let Some(parts) = parts.filter(|_| !name.is_empty()) else {
            return Err(SubjectError::NoNameOrParts {
                subject: subject.to_string(),
            });
        };

        let normalized = normalize_part_count(&parts);
        let Some((index, total)) = normalized.split_once('/') else {
            return Err(SubjectError::MissingSeparator {
                subject: subject.to_string(),
                parts: normalized,
            });
        };

        let total_raw = total.trim().to_string();
        let (Ok(part_index), Ok(total_parts)) =
            (index.trim().parse::<u32>(), total_raw.parse::<u32>())
        else {
            return Err(SubjectError::InvalidPartCount {
                subject: subject.to_string(),
                parts: normalized,
            });
        };

        trace!(subject, name = %name, part_index, total_parts, "Parsed subject");
        Ok(ParsedSubject {
            name,
            part_index,
            total_parts,
            total_raw,
        })
    }

    /// Trimmed values of every named group that participated, empty ones included.
    fn named_captures(&self, subject: &str) -> BTreeMap<String, String> {
        let Some(caps) = self.pattern.captures(subject) else {
            return BTreeMap::new();
        };

        self.pattern
            .capture_names()
            .flatten()
            .filter_map(|group| {
                let value = caps.name(group)?.as_str().trim();
                Some((group.to_string(), value.to_string()))
            })
            .collect()
    }
}

/// Parses a subject with the default composite pattern.
///
/// # Errors
///
/// See [`SubjectParser::parse`].
pub fn parse_subject(subject: &str) -> Result<ParsedSubject, SubjectError> {
    SubjectParser::default().parse(subject)
}

/// Joins non-empty captured values in capture-group-name order.
fn synthesize_name(fields: &BTreeMap<String, String>) -> String {
    fields
        .values()
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrites `N-M`, `N~M` and `N of M` forms to `N/M` and drops brackets.
fn normalize_part_count(parts: &str) -> String {
    if parts.contains('/') {
        return parts.to_string();
    }

    parts
        .to_ascii_lowercase()
        .replace(" of ", "/")
        .replace(['-', '~'], "/")
        .replace(['[', ']', '(', ')'], "")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subject_quoted_name_and_counter() {
        let parsed = parse_subject(r#"[001/034] - "My.Show.S01E01.mkv" yEnc"#).unwrap();
        assert_eq!(parsed.name, "My.Show.S01E01");
        assert_eq!(parsed.part_index, 1);
        assert_eq!(parsed.total_parts, 34);
        assert_eq!(parsed.total_raw, "034");
    }

    #[test]
    fn test_parse_subject_extension_is_case_insensitive() {
        let parsed = parse_subject(r#"Movie (2/10) "Holiday.Film.AVI" yEnc (1/50)"#).unwrap();
        assert_eq!(parsed.name, "Holiday.Film");
        assert_eq!(parsed.part_index, 2);
        assert_eq!(parsed.total_parts, 10);
    }

    #[test]
    fn test_parse_subject_numbered_rar_volume() {
        let parsed = parse_subject(r#"[05/12] - "archive.r03" yEnc"#).unwrap();
        assert_eq!(parsed.name, "archive");
        assert_eq!(parsed.total_parts, 12);
    }

    #[test]
    fn test_parse_subject_without_counter_fails() {
        let err = parse_subject(r#""lonely.file.mkv" yEnc"#).unwrap_err();
        assert!(matches!(err, SubjectError::NoNameOrParts { .. }));
    }

    #[test]
    fn test_parse_subject_empty_file_stem_fails() {
        let err = parse_subject(r#"[1/2] - ".mkv" yEnc"#).unwrap_err();
        assert_eq!(
            err,
            SubjectError::NoNameOrParts {
                subject: r#"[1/2] - ".mkv" yEnc"#.to_string(),
            }
        );
    }

    #[test]
    fn test_custom_pattern_whitespace_name_is_not_synthesized() {
        let parser = SubjectParser::with_pattern(
            Regex::new(r"\[(?P<parts>\d+/\d+)\] (?P<name>[^-]*)-(?P<tag>\w+)").unwrap(),
        );

        assert!(parser.parse("[1/3]  -release").is_err());
        assert_eq!(parser.parse("[1/3] clip -release").unwrap().name, "clip");
    }

    #[test]
    fn test_parse_subject_plain_chatter_fails() {
        let err = parse_subject("Re: anyone have the new release?").unwrap_err();
        assert_eq!(err.subject(), "Re: anyone have the new release?");
    }

    #[test]
    fn test_custom_pattern_uses_generic_counter_fallback() {
        let parser = SubjectParser::with_pattern(Regex::new(r"(?P<name>\w+) yEnc").unwrap());

        let parsed = parser.parse("(2 of 7) movie yEnc").unwrap();
        assert_eq!(parsed.name, "movie");
        assert_eq!(parsed.part_index, 2);
        assert_eq!(parsed.total_parts, 7);

        let parsed = parser.parse("[3-9] clip yEnc").unwrap();
        assert_eq!((parsed.part_index, parsed.total_parts), (3, 9));

        let parsed = parser.parse("song yEnc (4~5)").unwrap();
        assert_eq!((parsed.part_index, parsed.total_parts), (4, 5));
    }

    #[test]
    fn test_custom_pattern_reqid_fills_missing_name() {
        let parser = SubjectParser::with_pattern(
            Regex::new(r"\[(?P<reqid>\d+)\]-\[(?P<parts>\d+/\d+)\]").unwrap(),
        );

        let parsed = parser.parse("[12345]-[3/9] request fill").unwrap();
        assert_eq!(parsed.name, "12345");
        assert_eq!((parsed.part_index, parsed.total_parts), (3, 9));
    }

    #[test]
    fn test_custom_pattern_synthesized_name_is_ordered_by_group_name() {
        let parser = SubjectParser::with_pattern(
            Regex::new(r"(?P<show>[A-Za-z]+)-(?P<episode>E\d+)").unwrap(),
        );

        let first = parser.parse("Show-E05 [1-4]").unwrap();
        let second = parser.parse("Show-E05 [1-4]").unwrap();
        assert_eq!(first.name, "E05 Show");
        assert_eq!(first, second);
        assert_eq!((first.part_index, first.total_parts), (1, 4));
    }

    #[test]
    fn test_custom_pattern_counter_without_separator_fails() {
        let parser = SubjectParser::with_pattern(
            Regex::new(r"(?P<name>\w+) part (?P<parts>\d+)").unwrap(),
        );

        let err = parser.parse("file part 12").unwrap_err();
        assert_eq!(
            err,
            SubjectError::MissingSeparator {
                subject: "file part 12".to_string(),
                parts: "12".to_string(),
            }
        );
    }

    #[test]
    fn test_custom_pattern_non_numeric_counter_fails() {
        let parser = SubjectParser::with_pattern(
            Regex::new(r"(?P<name>\w+) \[(?P<parts>[a-z]+/[a-z]+)\]").unwrap(),
        );

        let err = parser.parse("file [a/b]").unwrap_err();
        assert!(matches!(err, SubjectError::InvalidPartCount { .. }));
    }

    #[test]
    fn test_normalize_part_count_forms() {
        assert_eq!(normalize_part_count("1/5"), "1/5");
        assert_eq!(normalize_part_count("1 of 5"), "1/5");
        assert_eq!(normalize_part_count("1 OF 5"), "1/5");
        assert_eq!(normalize_part_count("1-5"), "1/5");
        assert_eq!(normalize_part_count("1~5"), "1/5");
        assert_eq!(normalize_part_count("[1-5]"), "1/5");
        assert_eq!(normalize_part_count("(7)"), "7");
    }
}

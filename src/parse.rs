use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::index::{Entry, Index, KEY_LEN, normalize_key};

/// Counters describing what the parser kept and what it dropped.
///
/// Dropped lines never raise; they only show up here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub lines: usize,
    pub accepted: usize,
    pub too_few_fields: usize,
    pub bad_key: usize,
    pub empty_value: usize,
}

impl ParseStats {
    pub fn discarded(&self) -> usize {
        self.too_few_fields + self.bad_key + self.empty_value
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub index: Index,
    pub stats: ParseStats,
}

enum Rejection {
    TooFewFields,
    BadKey,
    EmptyValue,
}

/// Parses tab-delimited text into an [`Index`].
///
/// Rows are either `note<TAB>key<TAB>value[<TAB>...]` or `key<TAB>value`.
/// Keys are upper-cased and must be exactly two characters long.
/// A leading byte order mark is ignored.
pub fn parse_table(text: &str) -> ParseReport {
    let mut report = ParseReport::default();
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            continue;
        }
        report.stats.lines += 1;

        match parse_line(line) {
            Ok((key, entry)) => {
                report.index.push(key, entry);
                report.stats.accepted += 1;
            }
            Err(Rejection::TooFewFields) => report.stats.too_few_fields += 1,
            Err(Rejection::BadKey) => report.stats.bad_key += 1,
            Err(Rejection::EmptyValue) => report.stats.empty_value += 1,
        }
    }

    report
}

fn parse_line(line: &str) -> Result<(String, Entry), Rejection> {
    let fields: Vec<&str> = line.split('\t').collect();

    // Two columns are always (key, value); the order is never guessed from content.
    let (note, key, value) = match fields.as_slice() {
        [note, key, value, ..] => (*note, *key, *value),
        [key, value] => ("", *key, *value),
        _ => return Err(Rejection::TooFewFields),
    };

    let key = normalize_key(key);
    let value = value.trim();

    if key.chars().count() != KEY_LEN {
        return Err(Rejection::BadKey);
    }
    if value.is_empty() {
        return Err(Rejection::EmptyValue);
    }

    Ok((key, Entry::new(note.trim(), value)))
}

pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_entry(report: &ParseReport, key: &str) -> Entry {
        let entries = report.index.get(key).expect("key present");
        assert_eq!(entries.len(), 1);
        entries[0].clone()
    }

    #[test]
    fn three_fields_map_to_note_key_value() {
        let report = parse_table("note1\tAB\tvalueX\n");
        assert_eq!(only_entry(&report, "AB"), Entry::new("note1", "valueX"));
        assert_eq!(report.stats.accepted, 1);
    }

    #[test]
    fn two_fields_map_to_key_value_with_empty_note() {
        let report = parse_table("AB\tvalueY\n");
        assert_eq!(only_entry(&report, "AB"), Entry::new("", "valueY"));
    }

    #[test]
    fn empty_leading_field_gives_empty_note() {
        let report = parse_table("\tAB\tvalueZ\n");
        assert_eq!(only_entry(&report, "AB"), Entry::new("", "valueZ"));
    }

    #[test]
    fn single_character_key_is_discarded() {
        let report = parse_table("x\tA\tvalue\n");
        assert!(report.index.is_empty());
        assert_eq!(report.stats.bad_key, 1);
        assert_eq!(report.stats.discarded(), 1);
    }

    #[test]
    fn key_is_trimmed_and_upper_cased() {
        let report = parse_table(" R2 D2 \t ab \t  R U R'  \n");
        assert_eq!(only_entry(&report, "AB"), Entry::new("R2 D2", "R U R'"));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let report = parse_table("n\tcd\tv\textra\tmore\n");
        assert_eq!(only_entry(&report, "CD"), Entry::new("n", "v"));
    }

    #[test]
    fn rejects_are_counted_by_reason() {
        let text = "no tabs here\nABC\tvalue\nn\tAB\t   \nok\tEF\tv\n";
        let report = parse_table(text);
        assert_eq!(report.stats.lines, 4);
        assert_eq!(report.stats.too_few_fields, 1);
        assert_eq!(report.stats.bad_key, 1);
        assert_eq!(report.stats.empty_value, 1);
        assert_eq!(report.stats.accepted, 1);
        assert_eq!(report.index.key_count(), 1);
    }

    #[test]
    fn trailing_carriage_returns_are_stripped() {
        let report = parse_table("n1\tAB\tv1\r\nGH\tv2\r\n");
        assert_eq!(only_entry(&report, "AB"), Entry::new("n1", "v1"));
        assert_eq!(only_entry(&report, "GH"), Entry::new("", "v2"));
    }

    #[test]
    fn inner_carriage_return_is_kept_in_field() {
        let report = parse_table("a\rb\tAB\tv\n");
        assert_eq!(only_entry(&report, "AB").note, "a\rb");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let report = parse_table("\n   \n\t\nAB\tv\n\n");
        assert_eq!(report.stats.accepted, 1);
        assert_eq!(report.stats.lines, 1);
        assert_eq!(report.stats.discarded(), 0);
    }

    #[test]
    fn duplicate_keys_keep_input_order() {
        let report = parse_table("first\tAB\tv1\nsecond\tab\tv2\n");
        let entries = report.index.get("AB").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].note, "first");
        assert_eq!(entries[1].note, "second");
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "n\tAB\tv\nCD\tw\nx\tA\ty\n";
        assert_eq!(parse_table(text), parse_table(text));
    }

    #[test]
    fn two_field_rows_never_swap_columns() {
        // "valueish" is too long to be a key, so the row is dropped rather than reordered.
        let report = parse_table("valueish\tAB\n");
        assert!(report.index.is_empty());
        assert_eq!(report.stats.bad_key, 1);
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let report = parse_table("\u{feff}AB\tvalueY\r\nn\tCD\tw\r\n");
        assert_eq!(only_entry(&report, "AB"), Entry::new("", "valueY"));
        assert_eq!(only_entry(&report, "CD"), Entry::new("n", "w"));
        assert_eq!(report.stats.discarded(), 0);
    }

    #[test]
    fn hash_content_is_stable_hex() {
        let a = hash_content("AB\tv\n");
        assert_eq!(a.len(), 64);
        assert_eq!(a, hash_content("AB\tv\n"));
        assert_ne!(a, hash_content("AB\tw\n"));
    }
}

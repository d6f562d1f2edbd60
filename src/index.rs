//! Data model shared by the parser, the cache and the lookup engine.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Required key length, counted in characters.
pub const KEY_LEN: usize = 2;

/// Which of the two sheets an index was built from.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Primary,
    Secondary,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Primary => "primary",
            Category::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub note: String,
    pub value: String,
}

impl Entry {
    pub fn new(note: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            note: note.into(),
            value: value.into(),
        }
    }
}

/// Key to entries mapping for one category.
///
/// Entries under a key keep input order. Only the first one is ever returned
/// by a lookup, the rest are retained as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    entries: BTreeMap<String, Vec<Entry>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. The caller guarantees the key is already normalized.
    pub(crate) fn push(&mut self, key: String, entry: Entry) {
        self.entries.entry(key).or_default().push(entry);
    }

    pub fn get(&self, key: &str) -> Option<&[Entry]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks the invariants the parser guarantees. Payloads read back from
    /// storage go through this before being trusted.
    pub fn is_well_formed(&self) -> bool {
        self.entries.iter().all(|(key, entries)| {
            is_valid_key(key)
                && !entries.is_empty()
                && entries.iter().all(|e| !e.value.is_empty())
        })
    }
}

pub fn is_valid_key(key: &str) -> bool {
    key.chars().count() == KEY_LEN && key.to_uppercase() == key
}

pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

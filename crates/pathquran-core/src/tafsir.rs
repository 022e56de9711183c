//! Tafsir (commentary) table, per-chapter index, and range extraction.
//!
//! The bundled table is a flat JSON object keyed by range key. A value is
//! either a record holding the commentary text or a string naming another
//! key whose record should be used instead. Many consecutive verses share one
//! commentary this way.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reference::{chapter_prefix, key_position, VerseRange};

/// Longest pointer chain followed before a key is given up on.
pub const MAX_POINTER_HOPS: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TafsirRecord {
    #[serde(default, alias = "ayahKeys")]
    pub ayah_keys: Option<Vec<String>>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TafsirValue {
    /// Another key in the same table
    Pointer(String),
    Record(TafsirRecord),
    /// `null` or any other shape; treated as no entry
    Unusable(serde_json::Value),
}

/// A commentary entry with pointers followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TafsirEntry {
    pub ayahs: Vec<String>,
    pub text: String,
}

impl TafsirEntry {
    pub fn plain_text(&self) -> String {
        strip_tags(&self.text)
    }

    pub fn ayah_label(&self) -> String {
        self.ayahs.join(", ")
    }
}

/// The flat commentary table, in document order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct TafsirTable {
    entries: IndexMap<String, TafsirValue>,
}

impl TafsirTable {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| anyhow!("Failed to parse tafsir table: {}", e))
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

    pub fn get(&self, key: &str) -> Option<&TafsirValue> {
        self.entries.get(key)
    }

    /// Follow pointers from `key` to a record.
    ///
    /// Missing keys, unusable values, and chains longer than
    /// [`MAX_POINTER_HOPS`] (which includes every cycle) all give `None`.
    pub fn resolve_record(&self, key: &str) -> Option<&TafsirRecord> {
        let mut current = key;
        for _ in 0..=MAX_POINTER_HOPS {
            match self.entries.get(current)? {
                TafsirValue::Record(record) => return Some(record),
                TafsirValue::Pointer(next) => current = next,
                TafsirValue::Unusable(_) => return None,
            }
        }
        debug!(key, hops = MAX_POINTER_HOPS, "tafsir pointer chain too long, dropping key");
        None
    }

    pub fn resolve(&self, key: &str) -> Option<TafsirEntry> {
        let record = self.resolve_record(key)?;
        Some(TafsirEntry {
            ayahs: record
                .ayah_keys
                .clone()
                .unwrap_or_else(|| vec![key.to_string()]),
            text: record.text.clone().unwrap_or_default(),
        })
    }

    /// Commentary for a typed range (`2:2` or `2:2-5`), formatted for display
    /// and for the explanation prompt. Empty when the input is malformed or
    /// nothing matches.
    ///
    /// Keys are scanned in table order and every key in the range gets its
    /// own section, even when several keys resolve to the same commentary.
    pub fn range_text(&self, input: &str) -> String {
        let Some(range) = VerseRange::parse(input) else {
            return String::new();
        };

        let mut sections = Vec::new();

        for key in self.keys() {
            let Some((chapter, verse)) = key_position(key) else {
                continue;
            };
            if !range.contains(chapter, verse) {
                continue;
            }
            let Some(record) = self.resolve_record(key) else {
                continue;
            };
            let text = record.text.as_deref().unwrap_or_default();
            sections.push(format!("**{}**:\n{}", key, strip_tags(text)));
        }

        sections.join("\n\n")
    }
}

impl FromIterator<(String, TafsirValue)> for TafsirTable {
    fn from_iter<I: IntoIterator<Item = (String, TafsirValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Commentary grouped by chapter, de-duplicated by text.
#[derive(Debug, Clone, Default)]
pub struct TafsirIndex {
    chapters: IndexMap<String, Vec<TafsirEntry>>,
}

impl TafsirIndex {
    pub fn build(table: &TafsirTable) -> Self {
        let mut chapters: IndexMap<String, Vec<TafsirEntry>> = IndexMap::new();
        let mut seen_texts: HashMap<String, HashSet<String>> = HashMap::new();

        for key in table.keys() {
            let Some(entry) = table.resolve(key) else {
                continue;
            };
            let prefix = chapter_prefix(key);

            // Several keys usually point at one canonical record
            let seen = seen_texts.entry(prefix.to_string()).or_default();
            if !seen.insert(entry.text.clone()) {
                continue;
            }

            chapters.entry(prefix.to_string()).or_default().push(entry);
        }

        debug!(chapters = chapters.len(), "built tafsir index");
        Self { chapters }
    }

    pub fn chapter(&self, chapter: u32) -> &[TafsirEntry] {
        self.by_prefix(&chapter.to_string())
    }

    pub fn by_prefix(&self, prefix: &str) -> &[TafsirEntry] {
        self.chapters
            .get(prefix)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }
}

/// Remove `<...>` markup from commentary text.
pub fn strip_tags(text: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
    tags.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> TafsirValue {
        TafsirValue::Record(TafsirRecord {
            ayah_keys: None,
            text: Some(text.to_string()),
        })
    }

    fn grouped(keys: &[&str], text: &str) -> TafsirValue {
        TafsirValue::Record(TafsirRecord {
            ayah_keys: Some(keys.iter().map(|k| k.to_string()).collect()),
            text: Some(text.to_string()),
        })
    }

    fn pointer(target: &str) -> TafsirValue {
        TafsirValue::Pointer(target.to_string())
    }

    fn table(entries: Vec<(&str, TafsirValue)>) -> TafsirTable {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_direct_record_resolves_to_own_key() {
        let table = table(vec![("1:1", record("In the name of God"))]);
        let entry = table.resolve("1:1").unwrap();
        assert_eq!(entry.ayahs, vec!["1:1"]);
        assert_eq!(entry.text, "In the name of God");
    }

    #[test]
    fn test_explicit_ayah_keys_are_kept() {
        let table = table(vec![("2:1", grouped(&["2:1", "2:2"], "Opening letters"))]);
        let entry = table.resolve("2:1").unwrap();
        assert_eq!(entry.ayahs, vec!["2:1", "2:2"]);
    }

    #[test]
    fn test_pointer_chain_reaches_terminal_record() {
        let table = table(vec![
            ("2:1", grouped(&["2:1", "2:2", "2:3"], "Guidance")),
            ("2:2", pointer("2:1")),
            ("2:3", pointer("2:2")),
        ]);
        assert_eq!(table.resolve("2:3").unwrap().text, "Guidance");
        assert_eq!(table.resolve("2:3").unwrap().ayahs, vec!["2:1", "2:2", "2:3"]);
    }

    #[test]
    fn test_pointer_without_ayah_keys_uses_original_key() {
        let table = table(vec![("2:1", record("Guidance")), ("2:2", pointer("2:1"))]);
        assert_eq!(table.resolve("2:2").unwrap().ayahs, vec!["2:2"]);
    }

    #[test]
    fn test_cyclic_pointers_resolve_to_nothing() {
        let table = table(vec![
            ("3:1", pointer("3:2")),
            ("3:2", pointer("3:1")),
            ("3:3", pointer("3:3")),
        ]);
        assert!(table.resolve("3:1").is_none());
        assert!(table.resolve("3:3").is_none());
    }

    #[test]
    fn test_long_chain_fails_closed() {
        let mut entries = vec![("4:0".to_string(), record("end"))];
        for i in 1..=MAX_POINTER_HOPS + 1 {
            entries.push((format!("4:{}", i), pointer(&format!("4:{}", i - 1))));
        }
        let table: TafsirTable = entries.into_iter().collect();
        assert!(table.resolve(&format!("4:{}", MAX_POINTER_HOPS)).is_some());
        assert!(table.resolve(&format!("4:{}", MAX_POINTER_HOPS + 1)).is_none());
    }

    #[test]
    fn test_dangling_pointer_is_skipped() {
        let table = table(vec![("5:1", pointer("5:99")), ("5:2", record("Present"))]);
        let index = TafsirIndex::build(&table);
        assert_eq!(index.chapter(5).len(), 1);
        assert_eq!(index.chapter(5)[0].text, "Present");
    }

    #[test]
    fn test_index_deduplicates_by_text() {
        let table = table(vec![
            ("2:1", grouped(&["2:1", "2:2"], "Shared")),
            ("2:2", pointer("2:1")),
            ("2:3", record("Shared")),
            ("2:4", record("Other")),
            ("3:1", record("Shared")),
        ]);
        let index = TafsirIndex::build(&table);

        let chapter_two = index.chapter(2);
        assert_eq!(chapter_two.len(), 2);
        assert_eq!(chapter_two[0].ayahs, vec!["2:1", "2:2"]);
        assert_eq!(chapter_two[1].text, "Other");

        // De-duplication is per chapter
        assert_eq!(index.chapter(3).len(), 1);
        assert_eq!(index.chapter_count(), 2);
    }

    #[test]
    fn test_key_without_colon_groups_under_empty_prefix() {
        let table = table(vec![("intro", record("Preface"))]);
        let index = TafsirIndex::build(&table);
        assert_eq!(index.by_prefix("").len(), 1);
    }

    #[test]
    fn test_unknown_chapter_is_empty() {
        let index = TafsirIndex::build(&TafsirTable::default());
        assert!(index.chapter(114).is_empty());
    }

    #[test]
    fn test_deserialize_bundled_shape() {
        let json = r#"{
            "1:1": {"ayah_keys": ["1:1"], "text": "<p>Praise</p>"},
            "1:2": "1:1",
            "1:3": null,
            "1:4": {"ayahKeys": ["1:4"], "text": null},
            "1:5": 42
        }"#;
        let table = TafsirTable::from_json_str(json).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["1:1", "1:2", "1:3", "1:4", "1:5"]);
        assert_eq!(table.get("1:2"), Some(&pointer("1:1")));
        assert!(table.resolve("1:3").is_none());
        assert_eq!(table.resolve("1:4").unwrap().text, "");
        assert!(table.resolve("1:5").is_none());
    }

    #[test]
    fn test_range_text_filters_and_strips_tags() {
        let table = table(vec![
            ("2:1", record("<b>One</b>")),
            ("2:2", record("Two")),
            ("2:3", record("Three")),
            ("2:4", record("Four")),
            ("3:2", record("Elsewhere")),
        ]);
        assert_eq!(table.range_text("2:2-3"), "**2:2**:\nTwo\n\n**2:3**:\nThree");
        assert_eq!(table.range_text("2:1"), "**2:1**:\nOne");
    }

    #[test]
    fn test_range_text_emits_one_section_per_key() {
        let table = table(vec![
            ("2:1", grouped(&["2:1", "2:2"], "Shared")),
            ("2:2", pointer("2:1")),
            ("2:3", record("Shared")),
            ("2:4", record("Own")),
        ]);
        assert_eq!(
            table.range_text("2:1-3"),
            "**2:1**:\nShared\n\n**2:2**:\nShared\n\n**2:3**:\nShared"
        );
        assert_eq!(table.range_text("2:2-4"), "**2:2**:\nShared\n\n**2:3**:\nShared\n\n**2:4**:\nOwn");
    }

    #[test]
    fn test_range_text_malformed_input_is_empty() {
        let table = table(vec![("2:2", record("Two"))]);
        assert_eq!(table.range_text("2"), "");
        assert_eq!(table.range_text("2:"), "");
        assert_eq!(table.range_text("2:x-y"), "");
        assert_eq!(table.range_text("2:9"), "");
    }

    #[test]
    fn test_range_text_is_idempotent() {
        let table = table(vec![("2:2", record("Two")), ("2:3", pointer("2:2"))]);
        let first = table.range_text("2:1-5");
        let second = table.range_text("2:1-5");
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello <i>there</i></p>"), "Hello there");
        assert_eq!(strip_tags("no markup"), "no markup");
    }
}

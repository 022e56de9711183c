use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::reference::VerseRange;
use crate::settings::{Preferences, Script, TranslationSource};
use crate::tafsir::TafsirTable;

pub const CHAPTER_NAMES_FILE: &str = "surah.json";
pub const UTHMANI_FILE: &str = "Uthmani.json";
pub const INDOPAK_FILE: &str = "indopakNew.json";
pub const CLEAR_QURAN_FILE: &str = "English.json";
pub const SAHIH_FILE: &str = "sahih.json";
pub const TRANSLITERATION_FILE: &str = "EnTrans.json";
pub const TAFSIR_FILE: &str = "tasfirEN.json";

pub type VerseMap = BTreeMap<u32, String>;

/// Chapter number -> verse number -> text. The bundled files key both
/// levels with numeric strings; they are read as numbers so iteration is in
/// reading order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct VerseTable {
    chapters: BTreeMap<u32, VerseMap>,
}

impl VerseTable {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| anyhow!("Failed to parse verse table: {}", e))
    }

    pub fn chapter(&self, chapter: u32) -> Option<&VerseMap> {
        self.chapters.get(&chapter)
    }

    pub fn verse(&self, chapter: u32, verse: u32) -> Option<&str> {
        self.chapters
            .get(&chapter)
            .and_then(|verses| verses.get(&verse))
            .map(String::as_str)
    }

    pub fn verse_numbers(&self, chapter: u32) -> Vec<u32> {
        self.chapter(chapter)
            .map(|verses| verses.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Verse text for a typed range, formatted `**C:N**: text` and joined by
    /// blank lines. Verses missing from the table are skipped; malformed input
    /// gives an empty string.
    pub fn range_text(&self, input: &str) -> String {
        let Some(range) = VerseRange::parse(input) else {
            return String::new();
        };

        range
            .verses()
            .filter_map(|verse| {
                self.verse(range.chapter, verse)
                    .map(|text| format!("**{}:{}**: {}", range.chapter, verse, text))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl FromIterator<(u32, u32, String)> for VerseTable {
    fn from_iter<I: IntoIterator<Item = (u32, u32, String)>>(iter: I) -> Self {
        let mut chapters: BTreeMap<u32, VerseMap> = BTreeMap::new();
        for (chapter, verse, text) in iter {
            chapters.entry(chapter).or_default().insert(verse, text);
        }
        Self { chapters }
    }
}

/// One verse as the reader shows it, with the renderings chosen in
/// preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseView<'a> {
    pub number: u32,
    pub script: Option<&'a str>,
    pub translation: Option<&'a str>,
    pub transliteration: Option<&'a str>,
}

/// Every bundled table, loaded once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    chapter_names: Vec<String>,
    uthmani: VerseTable,
    indopak: VerseTable,
    clear_quran: VerseTable,
    sahih: VerseTable,
    transliteration: VerseTable,
    tafsir: TafsirTable,
}

impl Corpus {
    pub fn new(chapter_names: Vec<String>) -> Self {
        Self {
            chapter_names,
            ..Self::default()
        }
    }

    pub async fn load(data_dir: &Path) -> Result<Self> {
        let names_path = data_dir.join(CHAPTER_NAMES_FILE);
        let content = tokio::fs::read_to_string(&names_path)
            .await
            .map_err(|e| anyhow!("Failed to read chapter names {:?}: {}", names_path, e))?;
        let chapter_names: Vec<String> = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse chapter names {:?}: {}", names_path, e))?;

        let corpus = Self {
            chapter_names,
            uthmani: load_optional(data_dir, UTHMANI_FILE).await?,
            indopak: load_optional(data_dir, INDOPAK_FILE).await?,
            clear_quran: load_optional(data_dir, CLEAR_QURAN_FILE).await?,
            sahih: load_optional(data_dir, SAHIH_FILE).await?,
            transliteration: load_optional(data_dir, TRANSLITERATION_FILE).await?,
            tafsir: load_optional(data_dir, TAFSIR_FILE).await?,
        };

        info!(
            chapters = corpus.chapter_names.len(),
            tafsir_keys = corpus.tafsir.len(),
            "loaded corpus from {:?}",
            data_dir
        );
        Ok(corpus)
    }

    pub fn with_script(mut self, script: Script, table: VerseTable) -> Self {
        match script {
            Script::Uthmani => self.uthmani = table,
            Script::IndoPak => self.indopak = table,
            Script::Off => {}
        }
        self
    }

    pub fn with_translation(mut self, source: TranslationSource, table: VerseTable) -> Self {
        match source {
            TranslationSource::ClearQuran => self.clear_quran = table,
            TranslationSource::SahihInternational => self.sahih = table,
        }
        self
    }

    pub fn with_transliteration(mut self, table: VerseTable) -> Self {
        self.transliteration = table;
        self
    }

    pub fn with_tafsir(mut self, table: TafsirTable) -> Self {
        self.tafsir = table;
        self
    }

    pub fn chapter_names(&self) -> &[String] {
        &self.chapter_names
    }

    pub fn chapter_count(&self) -> u32 {
        self.chapter_names.len() as u32
    }

    /// Name of a chapter, numbered from 1.
    pub fn chapter_name(&self, chapter: u32) -> Option<&str> {
        let idx = chapter.checked_sub(1)?;
        self.chapter_names.get(idx as usize).map(String::as_str)
    }

    pub fn script(&self, script: Script) -> Option<&VerseTable> {
        match script {
            Script::Uthmani => Some(&self.uthmani),
            Script::IndoPak => Some(&self.indopak),
            Script::Off => None,
        }
    }

    pub fn translation(&self, source: TranslationSource) -> &VerseTable {
        match source {
            TranslationSource::ClearQuran => &self.clear_quran,
            TranslationSource::SahihInternational => &self.sahih,
        }
    }

    pub fn transliteration(&self) -> &VerseTable {
        &self.transliteration
    }

    pub fn tafsir(&self) -> &TafsirTable {
        &self.tafsir
    }

    /// Verse numbers of a chapter, taken from the Uthmani table and falling
    /// back to whichever other table has the chapter.
    pub fn verse_numbers(&self, chapter: u32) -> Vec<u32> {
        [
            &self.uthmani,
            &self.indopak,
            &self.sahih,
            &self.clear_quran,
        ]
        .into_iter()
        .map(|table| table.verse_numbers(chapter))
        .find(|numbers| !numbers.is_empty())
        .unwrap_or_default()
    }

    pub fn chapter_view(&self, chapter: u32, prefs: &Preferences) -> Vec<VerseView<'_>> {
        let script = self.script(prefs.script);
        let translation = self.translation(prefs.translation);

        self.verse_numbers(chapter)
            .into_iter()
            .map(|number| VerseView {
                number,
                script: script.and_then(|table| table.verse(chapter, number)),
                translation: translation.verse(chapter, number),
                transliteration: if prefs.show_transliteration {
                    self.transliteration.verse(chapter, number)
                } else {
                    None
                },
            })
            .collect()
    }
}

async fn load_optional<T: DeserializeOwned + Default>(data_dir: &Path, file: &str) -> Result<T> {
    let path = data_dir.join(file);
    if !path.exists() {
        warn!("{} not found in {:?}, continuing without it", file, data_dir);
        return Ok(T::default());
    }

    let content = tokio::fs::read_to_string(&path).await?;
    serde_json::from_str(&content).map_err(|e| anyhow!("Failed to parse {:?}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sahih() -> VerseTable {
        vec![
            (2, 1, "Alif, Lam, Meem.".to_string()),
            (2, 2, "This is the Book about which there is no doubt.".to_string()),
            (2, 3, "Who believe in the unseen.".to_string()),
            (2, 4, "And who believe in what has been revealed to you.".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_range_text_selects_requested_verses_in_order() {
        let text = sahih().range_text("2:2-3");
        assert_eq!(
            text,
            "**2:2**: This is the Book about which there is no doubt.\n\n**2:3**: Who believe in the unseen."
        );
        assert!(!text.contains("2:1"));
        assert!(!text.contains("2:4"));
    }

    #[test]
    fn test_range_text_skips_missing_and_malformed() {
        let table = sahih();
        assert_eq!(table.range_text("2:4-9"), "**2:4**: And who believe in what has been revealed to you.");
        assert_eq!(table.range_text("9:1"), "");
        assert_eq!(table.range_text("2:x-y"), "");
        assert_eq!(table.range_text("2"), "");
    }

    #[test]
    fn test_numeric_keys_sort_numerically() {
        let table = VerseTable::from_json_str(r#"{"1": {"10": "ten", "2": "two", "1": "one"}}"#).unwrap();
        assert_eq!(table.verse_numbers(1), vec![1, 2, 10]);
        assert_eq!(table.verse(1, 10), Some("ten"));
    }

    #[test]
    fn test_chapter_name_is_one_based() {
        let corpus = Corpus::new(vec!["Al-Fatihah".to_string(), "Al-Baqarah".to_string()]);
        assert_eq!(corpus.chapter_name(1), Some("Al-Fatihah"));
        assert_eq!(corpus.chapter_name(2), Some("Al-Baqarah"));
        assert_eq!(corpus.chapter_name(0), None);
        assert_eq!(corpus.chapter_name(3), None);
    }

    #[test]
    fn test_chapter_view_follows_preferences() {
        let uthmani: VerseTable = vec![(2, 1, "الم".to_string())].into_iter().collect();
        let translit: VerseTable = vec![(2, 1, "Alif-Lam-Meem".to_string())].into_iter().collect();
        let corpus = Corpus::new(vec!["Al-Fatihah".into(), "Al-Baqarah".into()])
            .with_script(Script::Uthmani, uthmani)
            .with_translation(TranslationSource::SahihInternational, sahih())
            .with_transliteration(translit);

        let mut prefs = Preferences::default();
        let view = corpus.chapter_view(2, &prefs);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].script, Some("الم"));
        assert_eq!(view[0].translation, Some("Alif, Lam, Meem."));
        assert_eq!(view[0].transliteration, None);

        prefs.script = Script::Off;
        prefs.show_transliteration = true;
        prefs.translation = TranslationSource::ClearQuran;
        let view = corpus.chapter_view(2, &prefs);
        assert_eq!(view[0].script, None);
        assert_eq!(view[0].translation, None);
        assert_eq!(view[0].transliteration, Some("Alif-Lam-Meem"));
    }

    #[tokio::test]
    async fn test_load_from_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CHAPTER_NAMES_FILE), r#"["Al-Fatihah"]"#).unwrap();
        std::fs::write(
            dir.path().join(SAHIH_FILE),
            r#"{"1": {"1": "In the name of Allah, the Entirely Merciful, the Especially Merciful."}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(TAFSIR_FILE),
            r#"{"1:1": {"ayah_keys": ["1:1"], "text": "Opening"}}"#,
        )
        .unwrap();

        let corpus = Corpus::load(dir.path()).await.unwrap();
        assert_eq!(corpus.chapter_count(), 1);
        assert_eq!(corpus.verse_numbers(1), vec![1]);
        assert_eq!(corpus.tafsir().len(), 1);
        assert!(corpus.script(Script::Uthmani).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_requires_chapter_names() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Corpus::load(dir.path()).await.is_err());
    }
}

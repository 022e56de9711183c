//! Display preferences and the store keys they persist under.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::store::{self, KeyValueStore};

pub mod keys {
    pub const SCRIPT: &str = "script";
    pub const SHOW_TRANSLITERATION: &str = "showTrans";
    pub const TRANSLATION_FONT_SIZE: &str = "engFontSize";
    pub const SCRIPT_FONT_SIZE: &str = "arabicFont";
    pub const TRANSLATION_SOURCE: &str = "translationSource";
}

pub const TRANSLATION_FONT_SIZES: RangeInclusive<u32> = 10..=40;
pub const SCRIPT_FONT_SIZES: RangeInclusive<u32> = 20..=60;
pub const DEFAULT_TRANSLATION_FONT_SIZE: u32 = 18;
pub const DEFAULT_SCRIPT_FONT_SIZE: u32 = 30;

/// Which rendering of the Arabic text to show, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Script {
    #[default]
    #[serde(rename = "uthmani")]
    Uthmani,
    #[serde(rename = "indopak")]
    IndoPak,
    #[serde(rename = "of")]
    Off,
}

impl Script {
    pub fn as_str(&self) -> &'static str {
        match self {
            Script::Uthmani => "uthmani",
            Script::IndoPak => "indopak",
            Script::Off => "of",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "uthmani" => Some(Script::Uthmani),
            "indopak" => Some(Script::IndoPak),
            "of" | "off" => Some(Script::Off),
            _ => None,
        }
    }

    pub fn all() -> Vec<Script> {
        vec![Script::Uthmani, Script::IndoPak, Script::Off]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Script::Uthmani => "Uthmani",
            Script::IndoPak => "IndoPak",
            Script::Off => "OFF",
        }
    }

    pub fn next(&self) -> Script {
        match self {
            Script::Uthmani => Script::IndoPak,
            Script::IndoPak => Script::Off,
            Script::Off => Script::Uthmani,
        }
    }

    pub fn prev(&self) -> Script {
        match self {
            Script::Uthmani => Script::Off,
            Script::IndoPak => Script::Uthmani,
            Script::Off => Script::IndoPak,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TranslationSource {
    #[serde(rename = "clear-quran")]
    ClearQuran,
    #[default]
    #[serde(rename = "sahih-international")]
    SahihInternational,
}

impl TranslationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationSource::ClearQuran => "clear-quran",
            TranslationSource::SahihInternational => "sahih-international",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "clear-quran" | "clear" => Some(TranslationSource::ClearQuran),
            "sahih-international" | "sahih" => Some(TranslationSource::SahihInternational),
            _ => None,
        }
    }

    pub fn all() -> Vec<TranslationSource> {
        vec![TranslationSource::ClearQuran, TranslationSource::SahihInternational]
    }

    /// Label used on toggles
    pub fn display_name(&self) -> &'static str {
        match self {
            TranslationSource::ClearQuran => "Clear Quran",
            TranslationSource::SahihInternational => "Sahih Intl",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TranslationSource::ClearQuran => "The Clear Quran",
            TranslationSource::SahihInternational => "Sahih International",
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            TranslationSource::ClearQuran => "The Clear Quran by Mustafa Khattab",
            TranslationSource::SahihInternational => "Sahih International",
        }
    }

    pub fn toggled(&self) -> TranslationSource {
        match self {
            TranslationSource::ClearQuran => TranslationSource::SahihInternational,
            TranslationSource::SahihInternational => TranslationSource::ClearQuran,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub script: Script,
    pub show_transliteration: bool,
    pub translation_font_size: u32,
    pub script_font_size: u32,
    pub translation: TranslationSource,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            script: Script::default(),
            show_transliteration: false,
            translation_font_size: DEFAULT_TRANSLATION_FONT_SIZE,
            script_font_size: DEFAULT_SCRIPT_FONT_SIZE,
            translation: TranslationSource::default(),
        }
    }
}

impl Preferences {
    /// Read every preference that is present and well-typed; anything else
    /// keeps its default.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut prefs = Self::default();

        if let Some(script) = store::get_as::<Script>(store, keys::SCRIPT) {
            prefs.script = script;
        }
        if let Some(show) = store::get_as::<bool>(store, keys::SHOW_TRANSLITERATION) {
            prefs.show_transliteration = show;
        }
        if let Some(size) = store::get_as::<u32>(store, keys::TRANSLATION_FONT_SIZE) {
            prefs.translation_font_size = clamp_to(size, &TRANSLATION_FONT_SIZES);
        }
        if let Some(size) = store::get_as::<u32>(store, keys::SCRIPT_FONT_SIZE) {
            prefs.script_font_size = clamp_to(size, &SCRIPT_FONT_SIZES);
        }
        if let Some(source) = store::get_as::<TranslationSource>(store, keys::TRANSLATION_SOURCE) {
            prefs.translation = source;
        }

        prefs
    }

    pub fn step_translation_font(&mut self, delta: i32) {
        self.translation_font_size =
            step_within(self.translation_font_size, delta, &TRANSLATION_FONT_SIZES);
    }

    pub fn step_script_font(&mut self, delta: i32) {
        self.script_font_size = step_within(self.script_font_size, delta, &SCRIPT_FONT_SIZES);
    }
}

fn clamp_to(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

fn step_within(value: u32, delta: i32, range: &RangeInclusive<u32>) -> u32 {
    let stepped = value.saturating_add_signed(delta);
    clamp_to(stepped, range)
}

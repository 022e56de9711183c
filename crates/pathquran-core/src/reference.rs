//! Verse references: user-typed ranges ("2:255", "2:1-5") and the range keys
//! used to index per-verse data.

use std::fmt;
use std::ops::RangeInclusive;

/// A chapter plus an inclusive verse span. `end == start` for a single verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerseRange {
    pub chapter: u32,
    pub start: u32,
    pub end: u32,
}

impl VerseRange {
    pub fn single(chapter: u32, verse: u32) -> Self {
        Self {
            chapter,
            start: verse,
            end: verse,
        }
    }

    /// Parse `C:N` or `C:N-M`.
    ///
    /// Returns `None` for anything else: no colon, an empty side, or a
    /// chapter or start verse that isn't a number. A missing, zero or
    /// non-numeric end falls back to the start verse. Bounds and ordering
    /// are not checked, so `2:7-3` parses and simply covers no verses.
    pub fn parse(input: &str) -> Option<Self> {
        let (chapter, verses) = input.trim().split_once(':')?;
        let chapter = chapter.trim();
        let verses = verses.trim();
        if chapter.is_empty() || verses.is_empty() {
            return None;
        }

        let chapter = chapter.parse::<u32>().ok()?;
        let (start, end) = match verses.split_once('-') {
            Some((start, end)) => {
                let start = start.trim().parse::<u32>().ok()?;
                // An end that is empty, zero or not a number reads as a
                // single verse: "2:5-", "2:5-0" and "2:5-x" all mean 2:5
                match end.trim().parse::<u32>() {
                    Ok(end) if end > 0 => (start, end),
                    _ => (start, start),
                }
            }
            None => {
                let verse = verses.parse::<u32>().ok()?;
                (verse, verse)
            }
        };

        Some(Self {
            chapter,
            start,
            end,
        })
    }

    pub fn contains(&self, chapter: u32, verse: u32) -> bool {
        chapter == self.chapter && verse >= self.start && verse <= self.end
    }

    pub fn verses(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for VerseRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}:{}", self.chapter, self.start)
        } else {
            write!(f, "{}:{}-{}", self.chapter, self.start, self.end)
        }
    }
}

/// Chapter prefix of a range key: the text before the first `:`, or `""`
/// when the key has no colon.
pub fn chapter_prefix(key: &str) -> &str {
    key.split_once(':').map(|(chapter, _)| chapter).unwrap_or("")
}

/// Chapter and first verse of a range key. `"2:5-7"` gives `(2, 5)`.
pub fn key_position(key: &str) -> Option<(u32, u32)> {
    let (chapter, verses) = key.split_once(':')?;
    let chapter = chapter.trim().parse::<u32>().ok()?;
    let digits: String = verses
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let verse = digits.parse::<u32>().ok()?;
    Some((chapter, verse))
}

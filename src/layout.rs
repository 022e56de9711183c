use pathquran_core::VerseView;

/// What a reader row shows, so the renderer can style it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Number,
    Script,
    Transliteration,
    Translation,
    Blank,
}

/// Pre-wrapped rows for a single verse
#[derive(Debug, Clone)]
pub struct VerseLayout {
    pub number: u32,
    pub start_line: usize,
    pub rows: Vec<(RowKind, String)>,
}

impl VerseLayout {
    /// Rows up to but not including the trailing blank.
    fn content_height(&self) -> usize {
        self.rows
            .iter()
            .filter(|(kind, _)| *kind != RowKind::Blank)
            .count()
    }
}

/// Line-based layout of a whole chapter
#[derive(Debug, Clone, Default)]
pub struct ChapterLayout {
    pub verses: Vec<VerseLayout>,
    pub total_lines: usize,
}

impl ChapterLayout {
    /// Index of the verse occupying `line`. Lines past the end belong to the
    /// last verse.
    pub fn verse_at_line(&self, line: usize) -> Option<usize> {
        if self.verses.is_empty() {
            return None;
        }
        let idx = self
            .verses
            .partition_point(|verse| verse.start_line <= line);
        Some(idx.saturating_sub(1))
    }
}

/// Wrap text to fit within a given width, breaking on word boundaries.
/// A single word longer than the width gets a line of its own.
pub fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

pub fn calculate_chapter_layout(chapter: u32, views: &[VerseView<'_>], width: usize) -> ChapterLayout {
    let mut layouts = Vec::with_capacity(views.len());
    let mut current_line = 0;

    for view in views {
        let mut rows = vec![(RowKind::Number, format!("{}:{}", chapter, view.number))];

        let parts = [
            (RowKind::Script, view.script),
            (RowKind::Transliteration, view.transliteration),
            (RowKind::Translation, view.translation),
        ];
        for (kind, text) in parts {
            if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
                rows.extend(
                    wrap_text_to_width(text, width)
                        .into_iter()
                        .map(|line| (kind, line)),
                );
            }
        }
        rows.push((RowKind::Blank, String::new()));

        let line_count = rows.len();
        layouts.push(VerseLayout {
            number: view.number,
            start_line: current_line,
            rows,
        });
        current_line += line_count;
    }

    ChapterLayout {
        verses: layouts,
        total_lines: current_line,
    }
}

/// Scroll position that keeps the selected verse in view. Only moves when
/// the verse would otherwise be cut off.
pub fn calculate_scroll_for_verse(
    layout: &ChapterLayout,
    verse_idx: usize,
    view_height: usize,
    current_scroll: usize,
) -> usize {
    let Some(verse) = layout.verses.get(verse_idx) else {
        return 0;
    };
    if view_height == 0 {
        return verse.start_line;
    }

    let verse_start = verse.start_line;
    let verse_height = verse.content_height();
    let verse_end = verse_start + verse_height;

    if verse_height > view_height || verse_start < current_scroll {
        return verse_start;
    }

    if verse_end > current_scroll + view_height {
        return verse_end.saturating_sub(view_height);
    }

    current_scroll
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(number: u32, translation: &'static str) -> VerseView<'static> {
        VerseView {
            number,
            script: None,
            translation: Some(translation),
            transliteration: None,
        }
    }

    #[test]
    fn test_wrap_breaks_on_words() {
        let lines = wrap_text_to_width("In the name of Allah the Most Merciful", 12);
        assert_eq!(lines, vec!["In the name", "of Allah the", "Most", "Merciful"]);
    }

    #[test]
    fn test_wrap_keeps_long_word_whole() {
        let lines = wrap_text_to_width("bismillahirrahmanirrahim ok", 5);
        assert_eq!(lines, vec!["bismillahirrahmanirrahim", "ok"]);
    }

    #[test]
    fn test_wrap_empty_text() {
        assert_eq!(wrap_text_to_width("", 10), vec![String::new()]);
    }

    #[test]
    fn test_layout_counts_rows_per_verse() {
        let views = vec![
            VerseView {
                number: 1,
                script: Some("الم"),
                translation: Some("Alif, Lam, Meem."),
                transliteration: Some("Alif-Lam-Meem"),
            },
            view(2, "This is the Book about which there is no doubt"),
        ];
        let layout = calculate_chapter_layout(2, &views, 20);

        // number, script, transliteration, translation, blank
        assert_eq!(layout.verses[0].rows.len(), 5);
        assert_eq!(layout.verses[0].rows[0], (RowKind::Number, "2:1".to_string()));
        assert_eq!(layout.verses[1].start_line, 5);
        // "This is the Book" / "about which there is" / "no doubt"
        assert_eq!(layout.verses[1].rows.len(), 5);
        assert_eq!(layout.total_lines, 10);
    }

    #[test]
    fn test_verse_at_line() {
        let views = vec![view(1, "a"), view(2, "b"), view(3, "c")];
        let layout = calculate_chapter_layout(1, &views, 40);

        assert_eq!(layout.verse_at_line(0), Some(0));
        assert_eq!(layout.verse_at_line(2), Some(0));
        assert_eq!(layout.verse_at_line(3), Some(1));
        assert_eq!(layout.verse_at_line(100), Some(2));
        assert_eq!(ChapterLayout::default().verse_at_line(0), None);
    }

    #[test]
    fn test_scroll_is_lazy() {
        let views: Vec<_> = (1..=10).map(|n| view(n, "text")).collect();
        let layout = calculate_chapter_layout(1, &views, 40);

        // each verse is 3 rows; a 6-row view fits two verses
        assert_eq!(calculate_scroll_for_verse(&layout, 1, 6, 0), 0);
        assert_eq!(calculate_scroll_for_verse(&layout, 2, 6, 0), 2);
        assert_eq!(calculate_scroll_for_verse(&layout, 0, 6, 6), 0);
        assert_eq!(calculate_scroll_for_verse(&layout, 9, 6, 0), 23);
    }

    #[test]
    fn test_scroll_out_of_range_resets() {
        let layout = calculate_chapter_layout(1, &[view(1, "a")], 40);
        assert_eq!(calculate_scroll_for_verse(&layout, 5, 10, 7), 0);
    }
}

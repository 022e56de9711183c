use pathquran_core::explain::{split_sections, ExplanationRequest, Section};
use pathquran_core::last_read::LAST_READ_WINDOW;
use pathquran_core::{
    AppState, CompletionError, Corpus, Explainer, LastRead, LastReadWriter, TafsirEntry,
    TafsirIndex,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const LIMIT_REACHED_TITLE: &str = "Limit Reached";
pub const LIMIT_REACHED_MESSAGE: &str =
    "The AI explanation service is temporarily unavailable due to high usage. Please try again later.";
const UNKNOWN_ERROR: &str = "An unknown error occurred.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Tafsir,
    Explain,
}

impl Tab {
    pub fn all() -> [Tab; 3] {
        [Tab::Home, Tab::Tafsir, Tab::Explain]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Tafsir => "Tafsir",
            Tab::Explain => "AI",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Home => 0,
            Tab::Tafsir => 1,
            Tab::Explain => 2,
        }
    }

    pub fn next(&self) -> Tab {
        match self {
            Tab::Home => Tab::Tafsir,
            Tab::Tafsir => Tab::Explain,
            Tab::Explain => Tab::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Rows of the settings popup, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    Script,
    Transliteration,
    Translation,
    TranslationFont,
    ScriptFont,
    Reset,
}

impl SettingsRow {
    pub fn all() -> [SettingsRow; 6] {
        [
            SettingsRow::Script,
            SettingsRow::Transliteration,
            SettingsRow::Translation,
            SettingsRow::TranslationFont,
            SettingsRow::ScriptFont,
            SettingsRow::Reset,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

/// An open chapter in the reader.
#[derive(Debug, Clone)]
pub struct ReaderState {
    pub chapter: u32,
    pub verses: Vec<u32>,
    pub selected: usize,
    pub line_scroll: usize,
    pub view_height: usize,
    /// Index of the verse at the top of the view, set while rendering.
    pub top_verse_idx: Option<usize>,
    /// Put the selected verse at the top on the next layout.
    pub pending_jump: bool,
}

impl ReaderState {
    /// Open `chapter` with `target` selected, or the first verse if the
    /// chapter has no such verse.
    pub fn open(chapter: u32, verses: Vec<u32>, target: u32) -> Self {
        let selected = verses.iter().position(|&v| v == target).unwrap_or(0);
        Self {
            chapter,
            verses,
            selected,
            line_scroll: 0,
            view_height: 0,
            top_verse_idx: None,
            pending_jump: true,
        }
    }

    pub fn selected_verse(&self) -> Option<u32> {
        self.verses.get(self.selected).copied()
    }

    /// The reading position: whichever verse sits at the top of the view.
    pub fn top_verse(&self) -> Option<u32> {
        self.top_verse_idx.and_then(|idx| self.verses.get(idx).copied())
    }

    pub fn select_next(&mut self) {
        if !self.verses.is_empty() {
            self.selected = (self.selected + 1).min(self.verses.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.verses.len().saturating_sub(1);
    }

    /// Move by roughly half a screen of verses.
    pub fn select_half_page(&mut self, down: bool) {
        let step = (self.view_height / 8).max(1);
        for _ in 0..step {
            if down {
                self.select_next();
            } else {
                self.select_prev();
            }
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub tab: Tab,
    pub input_mode: InputMode,

    pub state: AppState,
    pub corpus: Corpus,
    pub explainer: Explainer,
    pub writer: LastReadWriter,
    /// Most recent reading position, shown on the home screen.
    pub last_read: LastRead,

    // Home
    pub home_state: ListState,
    pub reader: Option<ReaderState>,

    // Tafsir
    pub tafsir_index: Option<TafsirIndex>,
    pub tafsir_list_state: ListState,
    pub tafsir_chapter: Option<u32>,
    pub tafsir_scroll: u16,

    // AI explanation
    pub explain_input: String,
    pub explain_cursor: usize,
    pub explain_range: Option<String>,
    pub explain_sections: Vec<Section>,
    pub explain_error: Option<String>,
    pub explain_task: Option<JoinHandle<Result<String, CompletionError>>>,
    pub explain_scroll: u16,
    pub animation_frame: u8,

    // Popups
    pub show_settings: bool,
    pub settings_state: ListState,
    pub alert: Option<Alert>,

    // Body area for mouse hit-testing (updated during render)
    pub body_area: Option<Rect>,
}

impl App {
    /// Must be called from within a tokio runtime; it starts the last-read
    /// writer.
    pub fn new(corpus: Corpus, state: AppState, explainer: Explainer) -> Self {
        let writer = LastReadWriter::spawn(state.store(), LAST_READ_WINDOW);
        let last_read = state.last_read();

        let mut home_state = ListState::default();
        home_state.select(Some(0));
        let mut tafsir_list_state = ListState::default();
        tafsir_list_state.select(Some(0));
        let mut settings_state = ListState::default();
        settings_state.select(Some(0));

        Self {
            should_quit: false,
            tab: Tab::Home,
            input_mode: InputMode::Normal,

            state,
            corpus,
            explainer,
            writer,
            last_read,

            home_state,
            reader: None,

            tafsir_index: None,
            tafsir_list_state,
            tafsir_chapter: None,
            tafsir_scroll: 0,

            explain_input: String::new(),
            explain_cursor: 0,
            explain_range: None,
            explain_sections: Vec::new(),
            explain_error: None,
            explain_task: None,
            explain_scroll: 0,
            animation_frame: 0,

            show_settings: false,
            settings_state,
            alert: None,

            body_area: None,
        }
    }

    /// Flush the reading position and stop background work.
    pub async fn shutdown(self) {
        if let Some(task) = self.explain_task {
            task.abort();
        }
        self.writer.close().await;
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        if tab == Tab::Tafsir && self.tafsir_index.is_none() {
            self.tafsir_index = Some(TafsirIndex::build(self.corpus.tafsir()));
        }
        self.tab = tab;
        self.input_mode = InputMode::Normal;
    }

    // Home list: row 0 is the start/continue entry, then one row per chapter
    pub fn home_len(&self) -> usize {
        self.corpus.chapter_names().len() + 1
    }

    pub fn home_nav_down(&mut self) {
        let len = self.home_len();
        let i = self.home_state.selected().unwrap_or(0);
        self.home_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn home_nav_up(&mut self) {
        let i = self.home_state.selected().unwrap_or(0);
        self.home_state.select(Some(i.saturating_sub(1)));
    }

    pub fn home_enter(&mut self) {
        match self.home_state.selected().unwrap_or(0) {
            0 => self.continue_reading(),
            i => self.open_reader(i as u32, 1),
        }
    }

    pub fn continue_reading(&mut self) {
        let LastRead { surah, ayah } = self.last_read;
        self.open_reader(surah, ayah);
    }

    pub fn open_reader(&mut self, chapter: u32, target: u32) {
        let verses = self.corpus.verse_numbers(chapter);
        debug!(chapter, target, verses = verses.len(), "opening reader");
        self.reader = Some(ReaderState::open(chapter, verses, target));
        if chapter >= 1 {
            self.home_state.select(Some(chapter as usize));
        }
    }

    pub fn close_reader(&mut self) {
        self.track_reading_position();
        self.reader = None;
    }

    /// Report the verse at the top of the reader, if it has been laid out.
    pub fn track_reading_position(&mut self) {
        let Some(reader) = &self.reader else {
            return;
        };
        let Some(ayah) = reader.top_verse() else {
            return;
        };
        let position = LastRead::new(reader.chapter, ayah);
        self.writer.report(position);
        self.last_read = position;
    }

    pub fn reader_title(&self) -> String {
        let Some(reader) = &self.reader else {
            return String::new();
        };
        let name = self.corpus.chapter_name(reader.chapter).unwrap_or("Unknown");
        let prefs = self.state.preferences();
        format!(
            "{}. {}  |  {}  |  Text {}  Arabic {}",
            reader.chapter,
            name,
            prefs.translation.display_name(),
            prefs.translation_font_size,
            prefs.script_font_size
        )
    }

    // Tafsir tab
    pub fn tafsir_nav_down(&mut self) {
        match self.tafsir_chapter {
            Some(_) => self.tafsir_scroll = self.tafsir_scroll.saturating_add(1),
            None => {
                let len = self.corpus.chapter_names().len();
                if len > 0 {
                    let i = self.tafsir_list_state.selected().unwrap_or(0);
                    self.tafsir_list_state.select(Some((i + 1).min(len - 1)));
                }
            }
        }
    }

    pub fn tafsir_nav_up(&mut self) {
        match self.tafsir_chapter {
            Some(_) => self.tafsir_scroll = self.tafsir_scroll.saturating_sub(1),
            None => {
                let i = self.tafsir_list_state.selected().unwrap_or(0);
                self.tafsir_list_state.select(Some(i.saturating_sub(1)));
            }
        }
    }

    pub fn tafsir_enter(&mut self) {
        if self.tafsir_chapter.is_none() {
            if let Some(i) = self.tafsir_list_state.selected() {
                if i < self.corpus.chapter_names().len() {
                    self.tafsir_chapter = Some(i as u32 + 1);
                    self.tafsir_scroll = 0;
                }
            }
        }
    }

    pub fn tafsir_back(&mut self) {
        self.tafsir_chapter = None;
        self.tafsir_scroll = 0;
    }

    pub fn tafsir_entries(&self) -> &[TafsirEntry] {
        match (&self.tafsir_index, self.tafsir_chapter) {
            (Some(index), Some(chapter)) => index.chapter(chapter),
            _ => &[],
        }
    }

    pub fn tafsir_entry_count(&self, chapter: u32) -> usize {
        self.tafsir_index
            .as_ref()
            .map(|index| index.chapter(chapter).len())
            .unwrap_or(0)
    }

    // AI explanation
    pub fn explain_loading(&self) -> bool {
        self.explain_task.is_some()
    }

    /// Start an explanation for the typed range. Blank input and a request
    /// already in flight are ignored.
    pub fn submit_explanation(&mut self) {
        if self.explain_task.is_some() {
            return;
        }
        let translation = self.state.preferences().translation;
        let Some(request) = ExplanationRequest::build(&self.corpus, translation, &self.explain_input) else {
            return;
        };

        self.explain_range = Some(request.range.clone());
        self.explain_sections.clear();
        self.explain_error = None;
        self.explain_scroll = 0;
        self.input_mode = InputMode::Normal;

        let explainer = self.explainer.clone();
        self.explain_task = Some(tokio::spawn(async move { explainer.explain(&request).await }));
    }

    /// Collect the explanation if its task has finished.
    pub async fn poll_explanation(&mut self) {
        let finished = self
            .explain_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }
        let Some(task) = self.explain_task.take() else {
            return;
        };

        match task.await {
            Ok(result) => self.finish_explanation(result),
            Err(e) => {
                warn!(error = %e, "explanation task failed");
                self.explain_error = Some(UNKNOWN_ERROR.to_string());
            }
        }
    }

    pub fn finish_explanation(&mut self, result: Result<String, CompletionError>) {
        match result {
            Ok(text) => {
                self.explain_sections = split_sections(&text);
                self.explain_error = None;
            }
            Err(e) => {
                warn!(error = %e, "explanation failed");
                if e.is_rate_limited() {
                    self.alert = Some(Alert {
                        title: LIMIT_REACHED_TITLE.to_string(),
                        message: LIMIT_REACHED_MESSAGE.to_string(),
                    });
                }
                self.explain_sections.clear();
                self.explain_error = Some(e.to_string());
            }
        }
    }

    pub fn tick_animation(&mut self) {
        if self.explain_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Settings popup
    pub fn open_settings(&mut self) {
        self.show_settings = true;
        self.settings_state.select(Some(0));
    }

    pub fn settings_nav_down(&mut self) {
        let len = SettingsRow::all().len();
        let i = self.settings_state.selected().unwrap_or(0);
        self.settings_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn settings_nav_up(&mut self) {
        let i = self.settings_state.selected().unwrap_or(0);
        self.settings_state.select(Some(i.saturating_sub(1)));
    }

    pub fn selected_setting(&self) -> SettingsRow {
        let rows = SettingsRow::all();
        let i = self.settings_state.selected().unwrap_or(0);
        rows[i.min(rows.len() - 1)]
    }

    /// Change the selected setting one step. `forward` is right/Enter.
    pub fn adjust_setting(&mut self, forward: bool) {
        let delta = if forward { 1 } else { -1 };
        let prefs = *self.state.preferences();
        match self.selected_setting() {
            SettingsRow::Script => {
                let script = if forward { prefs.script.next() } else { prefs.script.prev() };
                self.state.set_script(script);
            }
            SettingsRow::Transliteration => {
                self.state.set_show_transliteration(!prefs.show_transliteration);
            }
            SettingsRow::Translation => self.state.set_translation(prefs.translation.toggled()),
            SettingsRow::TranslationFont => self.state.step_translation_font(delta),
            SettingsRow::ScriptFont => self.state.step_script_font(delta),
            SettingsRow::Reset => {
                if forward {
                    self.reset_to_defaults();
                }
            }
        }
    }

    pub fn reset_to_defaults(&mut self) {
        self.state.reset();
        self.writer.discard();
        self.last_read = LastRead::default();
        self.alert = Some(Alert {
            title: "Settings".to_string(),
            message: "All settings have been reset to defaults.".to_string(),
        });
    }
}

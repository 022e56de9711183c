use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, InputMode, Tab};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_explanation().await;
            app.track_reading_position();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Popups take every key while open
    if app.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.alert = None;
        }
        return;
    }
    if app.show_settings {
        handle_settings(app, key);
        return;
    }

    if app.input_mode == InputMode::Editing {
        handle_explain_editing(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('1') => {
            app.switch_tab(Tab::Home);
            return;
        }
        KeyCode::Char('2') => {
            app.switch_tab(Tab::Tafsir);
            return;
        }
        KeyCode::Char('3') => {
            app.switch_tab(Tab::Explain);
            return;
        }
        KeyCode::Tab => {
            app.switch_tab(app.tab.next());
            return;
        }
        KeyCode::Char('s') => {
            app.open_settings();
            return;
        }
        _ => {}
    }

    match app.tab {
        Tab::Home if app.reader.is_some() => handle_reader(app, key),
        Tab::Home => handle_home(app, key),
        Tab::Tafsir => handle_tafsir(app, key),
        Tab::Explain => handle_explain_normal(app, key),
    }
}

fn handle_home(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.home_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.home_nav_up(),
        KeyCode::Char('g') => app.home_state.select(Some(0)),
        KeyCode::Char('G') => app.home_state.select(Some(app.home_len() - 1)),
        KeyCode::Char('c') => app.continue_reading(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.home_enter(),
        _ => {}
    }
}

fn handle_reader(app: &mut App, key: KeyEvent) {
    if matches!(
        key.code,
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Left
    ) {
        app.close_reader();
        return;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let Some(reader) = app.reader.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Char('d') if ctrl => reader.select_half_page(true),
        KeyCode::Char('u') if ctrl => reader.select_half_page(false),
        KeyCode::Char('j') | KeyCode::Down => reader.select_next(),
        KeyCode::Char('k') | KeyCode::Up => reader.select_prev(),
        KeyCode::Char('g') => reader.select_first(),
        KeyCode::Char('G') => reader.select_last(),
        _ => {}
    }
}

fn handle_tafsir(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.tafsir_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.tafsir_nav_up(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.tafsir_enter(),
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Left => app.tafsir_back(),
        _ => {}
    }
}

fn handle_explain_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Char('/') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.explain_cursor = app.explain_input.chars().count();
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.explain_scroll = app.explain_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.explain_scroll = app.explain_scroll.saturating_sub(1);
        }
        KeyCode::Char('g') => app.explain_scroll = 0,
        _ => {}
    }
}

fn handle_explain_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.submit_explanation(),
        KeyCode::Backspace => {
            if app.explain_cursor > 0 {
                app.explain_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.explain_input, app.explain_cursor);
                app.explain_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.explain_input.chars().count();
            if app.explain_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.explain_input, app.explain_cursor);
                app.explain_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.explain_cursor = app.explain_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.explain_input.chars().count();
            app.explain_cursor = (app.explain_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.explain_cursor = 0,
        KeyCode::End => app.explain_cursor = app.explain_input.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.explain_input, app.explain_cursor);
            app.explain_input.insert(byte_pos, c);
            app.explain_cursor += 1;
        }
        _ => {}
    }
}

fn handle_settings(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('s') | KeyCode::Char('q') => app.show_settings = false,
        KeyCode::Char('j') | KeyCode::Down => app.settings_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.settings_nav_up(),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => app.adjust_setting(true),
        KeyCode::Char('h') | KeyCode::Left => app.adjust_setting(false),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.alert.is_some() || app.show_settings {
        return;
    }
    let in_body = app
        .body_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_body {
        return;
    }

    let down = match mouse.kind {
        MouseEventKind::ScrollDown => true,
        MouseEventKind::ScrollUp => false,
        _ => return,
    };

    match app.tab {
        Tab::Home => {
            if let Some(reader) = app.reader.as_mut() {
                if down {
                    reader.select_next();
                } else {
                    reader.select_prev();
                }
            } else if down {
                app.home_nav_down();
            } else {
                app.home_nav_up();
            }
        }
        Tab::Tafsir if down => app.tafsir_nav_down(),
        Tab::Tafsir => app.tafsir_nav_up(),
        Tab::Explain if down => app.explain_scroll = app.explain_scroll.saturating_add(3),
        Tab::Explain => app.explain_scroll = app.explain_scroll.saturating_sub(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathquran_core::{AppState, Config, Corpus, Explainer, MemoryStore};
    use std::sync::Arc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app() -> App {
        let corpus = Corpus::new(vec!["Al-Fatihah".into(), "Al-Baqarah".into()]);
        App::new(
            corpus,
            AppState::load(Arc::new(MemoryStore::new())),
            Explainer::from_config(&Config::new()),
        )
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("2:255", 2), 2);
        assert_eq!(char_to_byte_index("ع2", 1), 2);
        assert_eq!(char_to_byte_index("ab", 5), 2);
    }

    #[tokio::test]
    async fn test_tab_keys_switch_screens() {
        let mut app = app();

        handle_event(&mut app, key(KeyCode::Char('2'))).await.unwrap();
        assert_eq!(app.tab, Tab::Tafsir);
        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.tab, Tab::Explain);
        handle_event(&mut app, key(KeyCode::Char('1'))).await.unwrap();
        assert_eq!(app.tab, Tab::Home);
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_typing_range_does_not_trigger_shortcuts() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Char('3'))).await.unwrap();
        handle_event(&mut app, key(KeyCode::Char('i'))).await.unwrap();

        for c in "2:1-3".chars() {
            handle_event(&mut app, key(KeyCode::Char(c))).await.unwrap();
        }
        handle_event(&mut app, key(KeyCode::Left)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Backspace)).await.unwrap();

        assert_eq!(app.explain_input, "2:13");
        assert_eq!(app.tab, Tab::Explain);
        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_alert_swallows_keys_until_dismissed() {
        let mut app = app();
        app.alert = Some(crate::app::Alert {
            title: "Limit Reached".into(),
            message: "later".into(),
        });

        handle_event(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(!app.should_quit);
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(app.alert.is_none());
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_reader_escape_returns_to_list() {
        let mut app = app();
        app.open_reader(1, 1);

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(app.reader.is_none());
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_resize_keeps_reader_selection() {
        let mut app = app();
        app.open_reader(1, 1);

        handle_event(&mut app, AppEvent::Resize).await.unwrap();
        assert_eq!(app.tab, Tab::Home);
        assert!(app.reader.is_some());
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_settings_popup_closes_with_escape() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Char('s'))).await.unwrap();
        assert!(app.show_settings);
        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(!app.show_settings);
        app.shutdown().await;
    }
}

use ratatui::{
    layout::{Alignment, Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
    Frame,
};

use crate::app::{App, InputMode, SettingsRow, Tab};
use crate::layout::{calculate_chapter_layout, calculate_scroll_for_verse, RowKind};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// A rectangle of at most `width` x `height` centered in `area`.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn highlight_style() -> Style {
    Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    app.body_area = Some(body_area);

    render_header(app, frame, header_area);

    match app.tab {
        Tab::Home if app.reader.is_some() => render_reader(app, frame, body_area),
        Tab::Home => render_home(app, frame, body_area),
        Tab::Tafsir => render_tafsir(app, frame, body_area),
        Tab::Explain => render_explain(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    // Popups, alert on top
    if app.show_settings {
        render_settings(app, frame, area);
    }
    if app.alert.is_some() {
        render_alert(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" Path To Quran ", Style::default().fg(Color::Cyan).bold()),
        Span::raw(" "),
    ];

    for tab in Tab::all() {
        let label = format!(" {} {} ", tab.index() + 1, tab.title());
        let style = if tab == app.tab {
            Style::default().bg(Color::Cyan).fg(Color::Black).bold()
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(label, style));
    }

    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::DarkGray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.tab {
        Tab::Home if app.reader.is_some() => " READ ",
        Tab::Home => " HOME ",
        Tab::Tafsir => " TAFSIR ",
        Tab::Explain => " AI ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: Vec<(&str, &str)> = if app.alert.is_some() {
        vec![("Enter", "dismiss")]
    } else if app.show_settings {
        vec![("j/k", "nav"), ("h/l", "change"), ("Enter", "select"), ("Esc", "close")]
    } else {
        match (app.tab, app.input_mode) {
            (Tab::Explain, InputMode::Editing) => vec![("Enter", "explain"), ("Esc", "stop typing")],
            (Tab::Home, _) if app.reader.is_some() => {
                vec![("j/k", "verse"), ("^d/^u", "page"), ("Esc", "back"), ("s", "settings"), ("q", "quit")]
            }
            (Tab::Home, _) => vec![
                ("j/k", "nav"),
                ("Enter", "read"),
                ("c", "continue"),
                ("Tab", "next tab"),
                ("s", "settings"),
                ("q", "quit"),
            ],
            (Tab::Tafsir, _) if app.tafsir_chapter.is_some() => {
                vec![("j/k", "scroll"), ("Esc", "back"), ("Tab", "next tab"), ("q", "quit")]
            }
            (Tab::Tafsir, _) => vec![("j/k", "nav"), ("Enter", "open"), ("Tab", "next tab"), ("q", "quit")],
            (Tab::Explain, InputMode::Normal) => vec![
                ("i", "type range"),
                ("j/k", "scroll"),
                ("Tab", "next tab"),
                ("s", "settings"),
                ("q", "quit"),
            ],
        }
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    for (key, label) in pairs {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_home(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Surahs ");

    let last_read = app.last_read;
    let (label, detail) = if last_read.is_start() {
        ("Start Reading", String::new())
    } else {
        let name = app.corpus.chapter_name(last_read.surah).unwrap_or("Unknown");
        (
            "Continue Reading",
            format!("  {} {}:{}", name, last_read.surah, last_read.ayah),
        )
    };

    let mut items = vec![ListItem::new(Line::from(vec![
        Span::styled(format!(" {} ", label), Style::default().fg(Color::Green).bold()),
        Span::styled(detail, Style::default().fg(Color::DarkGray)),
    ]))];

    items.extend(
        app.corpus
            .chapter_names()
            .iter()
            .enumerate()
            .map(|(i, name)| ListItem::new(format!(" {:>3}. {} ", i + 1, name))),
    );

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style())
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.home_state);
}

fn render_reader(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", app.reader_title()));

    let inner_area = block.inner(area);
    let view_height = inner_area.height as usize;
    // One column stays free for the scrollbar
    let inner_width = inner_area.width.saturating_sub(1) as usize;

    let prefs = *app.state.preferences();
    let Some(chapter) = app.reader.as_ref().map(|r| r.chapter) else {
        return;
    };
    let layout = {
        let views = app.corpus.chapter_view(chapter, &prefs);
        calculate_chapter_layout(chapter, &views, inner_width)
    };

    let Some(reader) = app.reader.as_mut() else {
        return;
    };

    if layout.verses.is_empty() {
        reader.top_verse_idx = None;
        let placeholder = Paragraph::new("No verses found for this surah.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    reader.view_height = view_height;
    reader.line_scroll = match layout.verses.get(reader.selected) {
        Some(verse) if reader.pending_jump => verse.start_line,
        _ => calculate_scroll_for_verse(&layout, reader.selected, view_height, reader.line_scroll),
    };
    reader.pending_jump = false;
    reader.top_verse_idx = layout.verse_at_line(reader.line_scroll);

    let scroll_start = reader.line_scroll;
    let scroll_end = scroll_start + view_height;
    let selected = reader.selected;

    let mut lines: Vec<Line> = Vec::new();
    for (idx, verse) in layout.verses.iter().enumerate() {
        if verse.start_line + verse.rows.len() <= scroll_start {
            continue;
        }
        if verse.start_line >= scroll_end {
            break;
        }

        let is_cursor = idx == selected;
        for (row_idx, (kind, text)) in verse.rows.iter().enumerate() {
            let global_line = verse.start_line + row_idx;
            if global_line < scroll_start || global_line >= scroll_end {
                continue;
            }

            let line = match kind {
                RowKind::Number => {
                    let style = if is_cursor {
                        Style::default().fg(Color::Black).bg(Color::Yellow).bold()
                    } else {
                        Style::default().fg(Color::Yellow).bold()
                    };
                    Line::from(Span::styled(format!(" {} ", text), style))
                }
                RowKind::Script => Line::from(text.clone())
                    .style(Style::default().fg(Color::White))
                    .alignment(Alignment::Right),
                RowKind::Transliteration => Line::from(Span::styled(
                    text.clone(),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )),
                RowKind::Translation if is_cursor => {
                    Line::styled(text.clone(), Style::default().bg(Color::DarkGray))
                }
                RowKind::Translation => Line::from(text.clone()),
                RowKind::Blank => Line::default(),
            };
            lines.push(line);
        }
    }

    // Text is pre-wrapped, so no Paragraph wrapping here
    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);

    if layout.total_lines > view_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));
        let mut scrollbar_state = ScrollbarState::new(layout.total_lines).position(scroll_start);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_tafsir(app: &mut App, frame: &mut Frame, area: Rect) {
    match app.tafsir_chapter {
        Some(chapter) => render_tafsir_entries(app, frame, area, chapter),
        None => render_tafsir_chapters(app, frame, area),
    }
}

fn render_tafsir_chapters(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Tafsir (Maulana Wahiduddin Khan) ");

    let items: Vec<ListItem> = app
        .corpus
        .chapter_names()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let chapter = i as u32 + 1;
            ListItem::new(Line::from(vec![
                Span::raw(format!(" {:>3}. {} ", chapter, name)),
                Span::styled(
                    format!("({})", app.tafsir_entry_count(chapter)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style())
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.tafsir_list_state);
}

fn render_tafsir_entries(app: &mut App, frame: &mut Frame, area: Rect, chapter: u32) {
    let name = app.corpus.chapter_name(chapter).unwrap_or("Unknown");
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {}. {} ", chapter, name));

    let entries = app.tafsir_entries();
    if entries.is_empty() {
        let placeholder = Paragraph::new("No Tafsir available.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for entry in entries {
        lines.push(Line::from(Span::styled(
            format!("Ayahs: {}", entry.ayah_label()),
            Style::default().fg(Color::Yellow).bold(),
        )));
        for text_line in entry.plain_text().lines() {
            lines.push(Line::from(text_line.trim().to_string()));
        }
        lines.push(Line::default());
    }

    // Keep at least the last line on screen
    let max_scroll = lines.len().saturating_sub(1) as u16;
    app.tafsir_scroll = app.tafsir_scroll.min(max_scroll);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.tafsir_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_explain(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, response_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::Editing;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Surah:Ayah range, e.g. 2:255 or 2:1-5 ");

    // Horizontal scrolling keeps the cursor visible
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.explain_cursor;
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };
    let visible_text: String = app
        .explain_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, input_area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }

    let title = match &app.explain_range {
        Some(range) => format!(
            " {} | {}: {} ",
            range,
            app.explainer.provider().display_name(),
            app.explainer.model()
        ),
        None => format!(
            " {}: {} ",
            app.explainer.provider().display_name(),
            app.explainer.model()
        ),
    };
    let response_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let text = if app.explain_loading() {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        Text::from(Span::styled(
            format!("Generating explanation{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else if let Some(error) = &app.explain_error {
        Text::from(Span::styled(
            format!("⚠️ {}", error),
            Style::default().fg(Color::Red),
        ))
    } else if app.explain_sections.is_empty() {
        Text::from(Span::styled(
            "Type a verse range and press Enter to get an explanation.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for section in &app.explain_sections {
            if let Some(header) = &section.header {
                lines.push(Line::from(Span::styled(
                    header.clone(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
            }
            for line in section.body.lines() {
                lines.push(parse_markdown_line(line));
            }
            lines.push(Line::default());
        }
        Text::from(lines)
    };

    let response = Paragraph::new(text)
        .block(response_block)
        .wrap(Wrap { trim: false })
        .scroll((app.explain_scroll, 0));
    frame.render_widget(response, response_area);
}

fn render_settings(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(area, 50, SettingsRow::all().len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let prefs = *app.state.preferences();
    let items: Vec<ListItem> = SettingsRow::all()
        .iter()
        .map(|row| {
            let (label, value) = match row {
                SettingsRow::Script => ("Arabic script", prefs.script.display_name().to_string()),
                SettingsRow::Transliteration => (
                    "Transliteration",
                    if prefs.show_transliteration { "On" } else { "Off" }.to_string(),
                ),
                SettingsRow::Translation => ("Translation", prefs.translation.display_name().to_string()),
                SettingsRow::TranslationFont => ("Translation font size", prefs.translation_font_size.to_string()),
                SettingsRow::ScriptFont => ("Arabic font size", prefs.script_font_size.to_string()),
                SettingsRow::Reset => {
                    return ListItem::new(" Reset to defaults ").style(Style::default().fg(Color::Red));
                }
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!(" {:<24}", label)),
                Span::styled(format!("< {} >", value), Style::default().fg(Color::Cyan)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Settings ");

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style())
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.settings_state);
}

fn render_alert(app: &App, frame: &mut Frame, area: Rect) {
    let Some(alert) = &app.alert else {
        return;
    };

    let popup_area = centered_rect(area, 60, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" {} ", alert.title));

    let text = Text::from(vec![
        Line::from(alert.message.clone()),
        Line::default(),
        Line::from(Span::styled("Press Enter to dismiss", Style::default().fg(Color::DarkGray))),
    ]);

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup_area);
}

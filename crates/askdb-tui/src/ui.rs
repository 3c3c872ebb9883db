use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use askdb_core::{classify, KeywordAnalysis, Message, NoticeLevel, Rendering};
use crate::app::{App, InputMode};

/// Widest a toast gets, borders included
const TOAST_WIDTH: u16 = 48;

/// Capitalize the first letter of every word ("animal code" -> "Animal Code")
fn capitalize_words(label: &str) -> String {
    label
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Estimate how many rows `lines` take once wrapped to `width` columns
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum::<usize>()
        .min(u16::MAX as usize) as u16
}

fn message_lines(message: &Message, max_records: Option<usize>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    match message {
        Message::Question { text } => {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            lines.extend(text.lines().map(|line| Line::from(line.to_string())));
        }
        Message::Answer { raw } => {
            lines.push(Line::from(Span::styled(
                "Answer:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Classified on every draw; only the raw payload is stored.
            lines.extend(answer_lines(&classify(raw).render(max_records)));
        }
    }

    lines.push(Line::default());
    lines
}

fn labelled_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{label}: "),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
        ),
        Span::styled(value, Style::default().fg(Color::DarkGray)),
    ])
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

fn analysis_lines(analysis: &KeywordAnalysis) -> Vec<Line<'static>> {
    let mut lines = vec![
        labelled_line("Tables", list_or_none(&analysis.tables)),
        labelled_line("Fields", list_or_none(&analysis.fields)),
    ];
    if !analysis.keywords.is_empty() {
        let keywords: Vec<String> = analysis
            .keywords
            .iter()
            .map(|m| format!("\"{}\" → {}", m.keyword, m.target))
            .collect();
        lines.push(labelled_line("Keywords", keywords.join(", ")));
    }
    lines
}

fn answer_lines(rendering: &Rendering) -> Vec<Line<'static>> {
    match rendering {
        Rendering::Error { message } => {
            let style = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
            message
                .lines()
                .enumerate()
                .map(|(i, line)| {
                    let prefix = if i == 0 { "✗ " } else { "  " };
                    Line::from(Span::styled(format!("{prefix}{line}"), style))
                })
                .collect()
        }
        Rendering::Records {
            records,
            hidden,
            status,
            sql,
            analysis,
        } => {
            let mut lines = Vec::new();

            if let Some(sql) = sql {
                lines.push(Line::from(Span::styled(
                    "SQL:",
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
                )));
                lines.extend(sql.lines().map(|line| {
                    Line::from(Span::styled(format!("  {line}"), Style::default().fg(Color::Cyan)))
                }));
            }
            if let Some(analysis) = analysis {
                lines.extend(analysis_lines(analysis));
            }

            for record in records {
                if let Some(header) = &record.header {
                    lines.push(Line::from(Span::styled(
                        header.clone(),
                        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                    )));
                }
                for field in &record.fields {
                    let mut spans = vec![Span::raw("  • ")];
                    if !field.label.is_empty() {
                        spans.push(Span::styled(
                            capitalize_words(&field.label),
                            Style::default().add_modifier(Modifier::BOLD),
                        ));
                        spans.push(Span::raw(": "));
                    }
                    spans.push(Span::raw(field.value.clone()));
                    lines.push(Line::from(spans));
                }
            }

            if *hidden > 0 {
                lines.push(Line::from(Span::styled(
                    format!("Showing {} of {} records", records.len(), records.len() + hidden),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
            lines.push(Line::from(Span::styled(
                status.clone(),
                Style::default().fg(Color::Green),
            )));

            lines
        }
        Rendering::Preformatted { text } => text
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Gray))))
            .collect(),
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat_screen(app, frame, body_area);
    render_footer(app, frame, footer_area);

    // Toasts float over everything
    render_toasts(app, frame, body_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" askdb ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.endpoint().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Black),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " CHAT ",
        InputMode::Editing => " ASK ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: &[(&str, &str)] = match app.input_mode {
        InputMode::Editing => &[
            ("Enter", "send"),
            ("Esc", "chat"),
            ("PgUp/PgDn", "scroll"),
            ("^C", "quit"),
        ],
        InputMode::Normal => &[
            ("i", "ask"),
            ("j/k", "scroll"),
            ("g/G", "top/bottom"),
            ("s", "schema"),
            ("d", "db status"),
            ("Esc", "dismiss"),
            ("q", "quit"),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style.add_modifier(Modifier::BOLD))];
    for (key, label) in hints {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!(" {key} "), key_style));
        spans.push(Span::styled(format!(" {label} "), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    // Chat history on top, input at the bottom
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store area for mouse hit-testing
    app.chat_area = Some(chat_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_focused = app.input_mode == InputMode::Normal;
    let chat_border_color = if chat_focused { Color::Cyan } else { Color::DarkGray };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(chat_border_color))
        .title(format!(" Conversation ({} messages) ", app.history.len()));

    let mut lines: Vec<Line> = Vec::new();

    if app.history.is_empty() && !app.is_submitting() {
        lines.push(Line::from(Span::styled(
            "Ask a question about your data...",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for message in app.history.iter() {
        lines.extend(message_lines(message, app.max_records));
    }

    if app.is_submitting() {
        lines.push(Line::from(Span::styled(
            "Answer:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    app.chat_lines = wrapped_height(&lines, app.chat_width);
    let max_scroll = app.chat_lines.saturating_sub(app.chat_height);
    app.chat_scroll = if app.follow_chat {
        max_scroll
    } else {
        app.chat_scroll.min(max_scroll)
    };

    // No trimming: raw answers rely on their indentation
    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if app.is_submitting() {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };
    let title = if app.is_submitting() {
        " Waiting for the answer... "
    } else {
        " Ask (Enter to send) "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    // Get the visible slice of the input
    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_toasts(app: &App, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width.saturating_sub(2));
    if width < 4 {
        return;
    }
    let x = area.x + area.width - width - 1;
    let mut y = area.y + 1;
    let bottom = area.y + area.height;

    for toast in &app.toasts {
        let (color, title) = match toast.notice.level {
            NoticeLevel::Success => (Color::Green, " Success "),
            NoticeLevel::Error => (Color::Red, " Error "),
            NoticeLevel::Info => (Color::Blue, " Info "),
            NoticeLevel::Warning => (Color::Yellow, " Warning "),
        };

        let body: Vec<Line> = toast
            .notice
            .message
            .lines()
            .map(|line| Line::from(line.to_string()))
            .collect();
        let height = wrapped_height(&body, width - 2) + 2;
        if y + height > bottom {
            break;
        }

        let toast_area = Rect::new(x, y, width, height);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(Span::styled(title, Style::default().fg(color).bold()));

        frame.render_widget(Clear, toast_area);
        frame.render_widget(
            Paragraph::new(body).block(block).wrap(Wrap { trim: true }),
            toast_area,
        );

        y += height;
    }
}

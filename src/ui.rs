use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use thinkchat_core::think::{self, Segment};
use thinkchat_core::{ChatRole, Message};
use crate::app::App;

/// Convert `**bold**` markdown in one line of text to styled spans on top of `base`.
fn parse_markdown_line(text: &str, base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c != '*' || chars.peek() != Some(&'*') {
            current_text.push(c);
            continue;
        }
        chars.next();

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
            if !current_text.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut current_text), base));
            }
            spans.push(Span::styled(bold_text, base.add_modifier(Modifier::BOLD)));
        } else {
            // Unterminated (often still streaming), keep it literal
            current_text.push_str("**");
            current_text.push_str(&bold_text);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::styled(current_text, base));
    }

    Line::from(spans)
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
    render_chat(app, frame, body_area);
    render_footer(app, frame, footer_area);

    if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" thinkchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}]", app.client.model()),
            Style::default().fg(Color::White),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let reasoning = app.conversation.in_flight().is_some_and(|msg| {
        think::is_thinking(&think::parse(&msg.content))
            || (msg.content.is_empty() && msg.thinking.as_deref().is_some_and(|t| !t.is_empty()))
    });

    let (mode_text, mode_style) = if reasoning {
        (" THINKING ", Style::default().bg(Color::Magenta).fg(Color::White))
    } else if app.is_loading() {
        (" STREAMING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let mut hints = if app.show_model_picker {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else if app.is_loading() {
        vec![
            Span::styled(" Esc ", key_style),
            Span::styled(" stop ", label_style),
        ]
    } else {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
        ]
    };

    if !app.show_model_picker {
        hints.extend(vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" skip ", label_style),
            Span::styled(" ^T ", key_style),
            Span::styled(if app.show_thoughts { " hide thoughts " } else { " show thoughts " }, label_style),
            Span::styled(" ^N ", key_style),
            Span::styled(" new question ", label_style),
            Span::styled(" ^L ", key_style),
            Span::styled(" model ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" ^C ", key_style),
            Span::styled(" quit ", label_style),
        ]);
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    let chat = Paragraph::new(Text::from(chat_lines(app))).wrap(Wrap { trim: false });

    // Keep the newest text in view unless the user scrolled up. Rows are
    // counted with the same word wrapping the paragraph renders with.
    let inner_width = chat_area.width.saturating_sub(2);
    let inner_height = chat_area.height.saturating_sub(2);
    let rows = chat.line_count(inner_width.max(1)).min(u16::MAX as usize) as u16;
    let max_scroll = rows.saturating_sub(inner_height);
    if app.follow_bottom || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_bottom = true;
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chat ");

    let chat = chat.block(chat_block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (title, border_color) = if app.is_loading() {
        (" Answering... (Esc to stop) ", Color::DarkGray)
    } else if app.conversation.messages().is_empty() {
        (" Ask me anything.. ", Color::Yellow)
    } else {
        (" Ask me more.. ", Color::Yellow)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else {
        (cursor_pos + 1).saturating_sub(inner_width)
    };

    let visible_text: String = app.query_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if !app.is_loading() && !app.show_model_picker {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Everything in the chat pane, top to bottom.
pub fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let messages = app.conversation.messages();
    if messages.is_empty() {
        return vec![Line::from(Span::styled(
            "Ask me anything..",
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    let last = messages.len() - 1;

    for (i, msg) in messages.iter().enumerate() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                push_assistant(app, msg, i == last, &mut lines);
            }
        }
        lines.push(Line::default());
    }

    if let Some(err) = &app.turn_error {
        lines.push(Line::from(Span::styled(
            format!("Something went wrong: {err}"),
            Style::default().fg(Color::Red),
        )));
    }

    lines
}

/// Render one assistant reply. The newest reply shows the typewriter's
/// progress instead of the full answer.
fn push_assistant(app: &App, msg: &Message, newest: bool, lines: &mut Vec<Line<'static>>) {
    let streaming = newest && app.is_loading();
    let segments = think::parse(&msg.content);

    // Reasoning reported out of band, when the text carries no tags itself
    if think::blocks(&segments).is_empty() {
        if let Some(thinking) = msg.thinking.as_deref().filter(|t| !t.is_empty()) {
            push_thinking_panel(app, thinking, streaming && msg.content.is_empty(), lines);
        }
    }

    if segments.is_empty() {
        if streaming && msg.thinking.as_deref().map_or(true, str::is_empty) {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        return;
    }

    let shown = think::displayed(&segments, app.config.answer_policy);
    let answer_idx = shown.len() - 1;

    for (idx, segment) in shown.into_iter().enumerate() {
        match segment {
            Segment::Thinking { content, closed } => {
                push_thinking_panel(app, content, !closed, lines);
            }
            Segment::Final { .. } if idx == answer_idx => {
                let answer = if newest {
                    app.typewriter.visible().to_string()
                } else {
                    think::final_answer(&segments)
                };
                for line in answer.lines() {
                    lines.push(parse_markdown_line(line, Style::default()));
                }
            }
            Segment::Final { content } => {
                for line in content.trim().lines() {
                    lines.push(Line::from(Span::styled(
                        line.to_string(),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
        }
    }
}

fn push_thinking_panel(app: &App, content: &str, open: bool, lines: &mut Vec<Line<'static>>) {
    let dots = if open {
        ".".repeat((app.animation_frame as usize) + 1)
    } else {
        String::new()
    };
    let toggle = if app.show_thoughts { "Hide Thoughts" } else { "Show Thoughts" };

    lines.push(Line::from(vec![
        Span::styled(
            format!("◆ Thinking{dots}"),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  [^T {toggle}]"), Style::default().fg(Color::DarkGray)),
    ]));

    if app.show_thoughts {
        let body = Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC);
        for line in content.trim().lines() {
            let mut styled = parse_markdown_line(line, body);
            styled.spans.insert(0, Span::styled("│ ", Style::default().fg(Color::Magenta)));
            lines.push(styled);
        }
    }
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = (app.available_models.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Model (Enter to select, Esc to cancel) ");

    let current = app.client.model();
    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if model == current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

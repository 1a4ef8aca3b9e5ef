use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use doplhy_core::{prompt::BOT_NAME, Role};

use crate::app::{App, ChatRow, FocusPane, Screen};

const KEY_URL: &str = "https://aistudio.google.com/app/apikey";

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

    match app.screen() {
        Screen::KeyGate => render_key_gate(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" Introduction to AI ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("Let's make your own chat bot!", Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if app.screen() == Screen::Chat {
        spans.push(Span::styled(
            format!("  [{}]", app.session().model()),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = match (app.screen(), app.focus) {
        (Screen::KeyGate, _) => (" KEY ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        (Screen::Chat, FocusPane::Question) => (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        (Screen::Chat, FocusPane::Knowledge) => (" EDIT ", Style::default().bg(Color::Green).fg(Color::Black)),
        (Screen::Chat, FocusPane::Transcript) => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
    };

    let hints: Vec<(&str, &str)> = match (app.screen(), app.focus) {
        (Screen::KeyGate, _) => vec![("Enter", "save & start"), ("Esc", "clear"), ("Ctrl+C", "quit")],
        (Screen::Chat, FocusPane::Question) => vec![
            ("Enter", "send"),
            ("Tab", "focus"),
            ("Ctrl+K", "change API key"),
            ("Ctrl+C", "quit"),
        ],
        (Screen::Chat, FocusPane::Knowledge) => vec![
            ("Enter", "newline"),
            ("Esc", "done"),
            ("Tab", "focus"),
            ("Ctrl+K", "change API key"),
        ],
        (Screen::Chat, FocusPane::Transcript) => vec![
            ("j/k", "scroll"),
            ("g/G", "top/bottom"),
            ("Tab", "focus"),
            ("q", "quit"),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style)];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Mask all but the last four characters of the key being typed.
fn mask_key(key: &str) -> String {
    let char_count = key.chars().count();
    if char_count <= 4 {
        return "*".repeat(char_count);
    }
    let masked_len = char_count - 4;
    let last_four: String = key.chars().skip(masked_len).collect();
    format!("{}{}", "*".repeat(masked_len), last_four)
}

fn render_key_gate(app: &App, frame: &mut Frame, area: Rect) {
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = 11.min(area.height);

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Welcome! ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [intro_area, _, input_area, status_area, help_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new("Please enter your Google AI Studio API key to begin."),
        intro_area,
    );

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" API Key ");
    let field_width = input_block.inner(input_area).width as usize;
    let masked = mask_key(app.key_input.as_str());
    let cursor_chars = app.key_input.cursor();

    // The masked text has the same length as the key, so the cursor maps 1:1
    let scroll_offset = if field_width > 0 && cursor_chars >= field_width {
        cursor_chars - field_width + 1
    } else {
        0
    };
    let visible: String = masked.chars().skip(scroll_offset).take(field_width).collect();
    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)).block(input_block),
        input_area,
    );
    frame.set_cursor_position((
        input_area.x + 1 + (cursor_chars - scroll_offset) as u16,
        input_area.y + 1,
    ));

    let status = if app.key_input.is_blank() {
        Span::styled("Type or paste a key, then press Enter", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            format!("{} characters - press Enter to save & start chatting", app.key_input.char_count()),
            Style::default().fg(Color::Green),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(status)), status_area);

    let mut help = vec![Line::from(vec![
        Span::styled("You can get a free key from ", Style::default().fg(Color::DarkGray)),
        Span::styled(KEY_URL, Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED)),
    ])];
    help.push(Line::from(Span::styled(
        "Your key is saved only on this computer.",
        Style::default().fg(Color::DarkGray),
    )));
    if let Some(notice) = app.notice_text() {
        help.push(Line::from(Span::styled(notice.to_string(), Style::default().fg(Color::Red))));
    }
    frame.render_widget(Paragraph::new(help).wrap(Wrap { trim: true }), help_area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    // Knowledge base on the left, chat on the right
    let [knowledge_area, chat_panel] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(area);

    render_knowledge(app, frame, knowledge_area);
    render_chat(app, frame, chat_panel);
}

fn render_knowledge(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Knowledge;
    let border_color = if focused { Color::Green } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" 📚 Knowledge Base ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [help_area, text_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
    ])
    .areas(inner);

    app.knowledge_area = Some(text_area);

    frame.render_widget(
        Paragraph::new("Type a story, facts, or any text here. Then, ask me questions about it in the chat!")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true }),
        help_area,
    );

    let width = text_area.width as usize;
    let height = text_area.height;
    let rows = app.knowledge.wrapped_lines(width);
    let (cursor_row, cursor_col) = app.knowledge.cursor_visual(width);
    let cursor_row = cursor_row as u16;

    if app.knowledge_follow {
        if cursor_row < app.knowledge_scroll {
            app.knowledge_scroll = cursor_row;
        } else if height > 0 && cursor_row >= app.knowledge_scroll + height {
            app.knowledge_scroll = cursor_row + 1 - height;
        }
    }
    let max_scroll = (rows.len() as u16).saturating_sub(height);
    app.knowledge_scroll = app.knowledge_scroll.min(max_scroll);

    let text = if app.knowledge.as_str().is_empty() && !focused {
        Text::from(Span::styled("Write your story here...", Style::default().fg(Color::DarkGray)))
    } else {
        Text::from(rows.into_iter().map(Line::from).collect::<Vec<_>>())
    };
    frame.render_widget(Paragraph::new(text).scroll((app.knowledge_scroll, 0)), text_area);

    if focused && cursor_row >= app.knowledge_scroll && cursor_row < app.knowledge_scroll + height {
        frame.set_cursor_position((
            text_area.x + (cursor_col as u16).min(text_area.width.saturating_sub(1)),
            text_area.y + cursor_row - app.knowledge_scroll,
        ));
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let notice_height = if app.notice_text().is_some() { 1 } else { 0 };

    let [chat_area, notice_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(notice_height),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);
    if app.follow_chat {
        app.scroll_chat_to_bottom();
    }

    let chat_focused = app.focus == FocusPane::Transcript;
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if chat_focused { Color::Cyan } else { Color::DarkGray }))
        .title(format!(" 💬 Chat with {} ", BOT_NAME));

    let user_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let bot_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    // Rows come pre-wrapped so the scroll bounds in App match what is drawn
    let lines: Vec<Line> = app
        .chat_rows()
        .into_iter()
        .map(|row| match row {
            ChatRow::Speaker(Role::User) => Line::from(Span::styled("You:", user_style)),
            ChatRow::Speaker(Role::Model) => Line::from(Span::styled(format!("{}:", BOT_NAME), bot_style)),
            ChatRow::Text(text) => Line::from(text),
            ChatRow::Blank => Line::default(),
            ChatRow::Thinking => {
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                Line::from(Span::styled(
                    format!("{} is thinking{}", BOT_NAME, dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                ))
            }
        })
        .collect();

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if let Some(notice) = app.notice_text() {
        frame.render_widget(
            Paragraph::new(notice.to_string())
                .style(Style::default().fg(Color::Red))
                .centered(),
            notice_area,
        );
    }

    // Question input - greyed out while a reply is outstanding
    let input_focused = app.focus == FocusPane::Question;
    let sending = app.is_sending();
    let input_border_color = if sending {
        Color::DarkGray
    } else if input_focused {
        Color::Yellow
    } else {
        Color::Gray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Ask ");

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = app.question.visible(inner_width);

    let input = if app.question.as_str().is_empty() {
        Paragraph::new(Span::styled(
            "Ask a question about the story...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        // Use cyan text to match the "You:" style - visible in both light and dark terminals
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(input.block(input_block), input_area);

    if input_focused && !sending {
        frame.set_cursor_position((input_area.x + 1 + cursor_x as u16, input_area.y + 1));
    }
}

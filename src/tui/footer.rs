use crate::app::{AppState, PromptMode, NARROW_WIDTH_THRESHOLD};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

fn hints(state: &AppState, narrow: bool) -> &'static [(&'static str, &'static str)] {
    if state.has_confirm_overlay() {
        return &[("y/Enter", "confirm"), ("n/Esc", "back")];
    }
    if state.has_detail_overlay() {
        return &[("o", "open"), ("d/q/Esc", "close")];
    }
    match state.prompt {
        PromptMode::Search => &[("type", "filter"), ("Enter", "keep"), ("Esc", "clear")],
        PromptMode::Definition => &[("0-9", "id"), ("Enter", "load"), ("Esc", "cancel")],
        PromptMode::None if narrow => &[
            ("j/k", "nav"),
            ("spc", "sel"),
            ("/", "find"),
            ("s", "status"),
            ("c", "cancel"),
            ("q", "quit"),
        ],
        PromptMode::None => &[
            ("↑↓/jk", "navigate"),
            ("space", "select"),
            ("a/A", "all/none"),
            ("/", "search"),
            ("s/S", "status"),
            ("t/T", "sort"),
            ("c", "cancel"),
            ("d", "details"),
            ("o", "open"),
            ("p", "definition"),
            ("r", "refresh"),
            ("q", "quit"),
        ],
    }
}

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < NARROW_WIDTH_THRESHOLD;

    let line = if let Some(notif) = state.notifications.last() {
        Line::from(vec![
            Span::styled("★ ", Style::default().fg(Color::Yellow)),
            Span::styled(&notif.message, Style::default().fg(Color::Yellow)),
        ])
    } else {
        let mut spans: Vec<Span> = Vec::new();
        for (i, (key, desc)) in hints(state, narrow).iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
            spans.push(Span::styled(
                format!(" {desc}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        Line::from(spans)
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(footer, area);
}

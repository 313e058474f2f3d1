use crate::app::ConfirmOverlay;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

/// Centered yes/no box. Keys are handled by `input::map_key`.
pub fn render(f: &mut Frame, overlay: &ConfirmOverlay) {
    let area = f.area();
    let width = 44u16.min(area.width);
    let height = 7u16.min(area.height);
    let popup = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    );
    f.render_widget(Clear, popup);

    let key = |k: &'static str, color: Color| {
        Span::styled(k, Style::default().fg(color).add_modifier(Modifier::BOLD))
    };
    let hint = |t: &'static str| Span::styled(t, Style::default().fg(Color::DarkGray));
    let hints = Line::from(vec![
        key("y", Color::Green),
        hint(" cancel runs   "),
        key("n", Color::Red),
        hint(" keep them "),
    ]);

    let block = Block::default()
        .title(format!(" {} ", overlay.title))
        .title_bottom(hints.centered())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));

    let body = vec![
        Line::from(""),
        Line::from(Span::styled(
            overlay.message.as_str(),
            Style::default().fg(Color::White),
        )),
    ];
    f.render_widget(
        Paragraph::new(body)
            .block(block)
            .centered()
            .wrap(Wrap { trim: true }),
        popup,
    );
}

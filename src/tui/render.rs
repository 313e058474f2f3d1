use crate::app::{ActiveOverlay, AppState};
use crate::tui::{confirm_overlay, detail_overlay, footer, header, table, toolbar};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

pub fn render(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Length(1), // search / filter / counters
            Constraint::Min(1),    // run table
            Constraint::Length(2), // footer
        ])
        .split(f.area());

    header::render(f, chunks[0], state);
    toolbar::render(f, chunks[1], state);
    table::render(f, chunks[2], state);
    footer::render(f, chunks[3], state);

    if let Some(err) = state.error_message() {
        render_error_toast(f, err);
    }

    match &state.overlay {
        ActiveOverlay::Detail(overlay) => detail_overlay::render(f, overlay),
        ActiveOverlay::Confirm(overlay) => confirm_overlay::render(f, overlay),
        ActiveOverlay::None => {}
    }
}

fn render_error_toast(f: &mut Frame, err: &str) {
    let area = f.area();
    if area.height <= 6 || area.width < 4 {
        return;
    }
    let toast = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(5),
        width: area.width.saturating_sub(2),
        height: 3,
    };
    let widget = Paragraph::new(err.to_owned())
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .title(" Error ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(widget, toast);
}

use crate::app::{truncate, AppState, EmptyReason, RunRecord, NARROW_WIDTH_THRESHOLD};
use chrono::{DateTime, Local};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let area = match state.load_error() {
        Some(err) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(0)])
                .split(area);
            render_load_banner(f, chunks[0], state, err);
            chunks[1]
        }
        None => area,
    };

    match state.empty_reason() {
        Some(reason) => render_empty(f, area, reason),
        None => render_rows(f, area, state),
    }
}

/// Shown whenever the last fetch failed. With runs still on screen it marks
/// them as stale.
fn render_load_banner(f: &mut Frame, area: Rect, state: &AppState, err: &str) {
    let text = match (state.runs.is_empty(), state.last_fetch) {
        (false, Some(at)) => format!(
            " ⚠ Refresh failed: {err} (showing results from {})",
            at.format("%H:%M:%S")
        ),
        (false, None) => format!(" ⚠ Refresh failed: {err} (results may be stale)"),
        (true, _) => format!(" ⚠ Could not load runs: {err}"),
    };
    let banner = Paragraph::new(truncate(&text, area.width as usize))
        .style(Style::default().fg(Color::Black).bg(Color::Red));
    f.render_widget(banner, area);
}

fn render_empty(f: &mut Frame, area: Rect, reason: EmptyReason) {
    let (text, color) = match reason {
        EmptyReason::Loading => ("Loading runs…", Color::Yellow),
        EmptyReason::LoadFailed => ("No data: the request failed. Press r to retry.", Color::Red),
        EmptyReason::NoRuns => ("No runs found for this definition.", Color::DarkGray),
        EmptyReason::NoMatches => (
            "No runs match the current search and status filter.",
            Color::DarkGray,
        ),
    };
    let widget = Paragraph::new(Line::from(Span::styled(text, Style::default().fg(color))))
        .centered()
        .wrap(Wrap { trim: true });
    let y = area.y + area.height / 3;
    let row = Rect::new(area.x, y, area.width, area.height.saturating_sub(y - area.y).min(2));
    f.render_widget(widget, row);
}

fn render_rows(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < NARROW_WIDTH_THRESHOLD;

    let mut header = vec!["", "ID", state.config.flavor.label_heading(), "Status"];
    let mut widths = vec![
        Constraint::Length(3),
        Constraint::Length(8),
        Constraint::Fill(1),
        Constraint::Length(12),
    ];
    if !narrow {
        header.extend(["Queued", "Started"]);
        widths.extend([Constraint::Length(11), Constraint::Length(11)]);
    }
    header.extend(["Link", ""]);
    widths.extend([Constraint::Length(4), Constraint::Length(1)]);

    let rows: Vec<Row> = state
        .visible_runs()
        .map(|run| build_row(run, state, narrow))
        .collect();

    let table = Table::new(rows, widths)
        .header(
            Row::new(header).style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        )
        .column_spacing(1)
        .row_highlight_style(Style::default().bg(Color::DarkGray));

    let mut table_state = TableState::default().with_selected(Some(state.cursor));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn build_row<'a>(run: &'a RunRecord, state: &AppState, narrow: bool) -> Row<'a> {
    let selected = state.is_selected(run.id);
    let checkbox = if selected { "[x]" } else { "[ ]" };
    let pending = state.pending_cancels.contains(&run.id);

    let mut cells = vec![
        Cell::from(checkbox).style(if selected {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        }),
        Cell::from(run.id.to_string()),
        Cell::from(run.label.as_str()),
        Cell::from(if pending { "cancelling…" } else { run.status.as_str() })
            .style(status_style(&run.status, run.result.as_deref())),
    ];
    if !narrow {
        cells.push(Cell::from(format_time(run.queue_time.as_deref())));
        cells.push(Cell::from(format_time(run.start_time.as_deref())));
    }
    cells.push(Cell::from(if run.detail_url.is_some() { " ↗" } else { "" }));
    cells.push(
        Cell::from(if state.run_errors.contains_key(&run.id) { "⚠" } else { "" })
            .style(Style::default().fg(Color::Red)),
    );
    Row::new(cells)
}

pub fn status_style(status: &str, result: Option<&str>) -> Style {
    let base = Style::default();
    match result.map(str::to_ascii_lowercase).as_deref() {
        Some("failed") => return base.fg(Color::Red),
        Some("canceled") => return base.fg(Color::DarkGray),
        Some("partiallysucceeded") => return base.fg(Color::Yellow),
        _ => {}
    }
    match status.to_ascii_lowercase().as_str() {
        "running" | "inprogress" => base.fg(Color::Yellow),
        "queued" | "notstarted" | "postponed" => base.fg(Color::Blue),
        "completed" => base.fg(Color::Green),
        "cancelling" | "canceling" => base.fg(Color::Magenta),
        _ => base.fg(Color::White),
    }
}

/// `MM-DD HH:MM` in local time; unparseable values are shown as-is.
pub fn format_time(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "-".to_string();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Local).format("%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_time_handles_azure_precision() {
        let out = format_time(Some("2024-01-15T10:30:00.1234567Z"));
        assert_eq!(out.len(), "01-15 10:30".len());
    }

    #[test]
    fn format_time_falls_back_to_raw() {
        assert_eq!(format_time(Some("yesterday")), "yesterday");
        assert_eq!(format_time(None), "-");
    }

    #[test]
    fn failed_result_wins_over_status() {
        assert_eq!(
            status_style("completed", Some("failed")),
            Style::default().fg(Color::Red)
        );
        assert_eq!(
            status_style("inProgress", None),
            Style::default().fg(Color::Yellow)
        );
    }
}

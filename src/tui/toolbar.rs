//! One-line strip under the header: search box, active filter and sort,
//! status counters and selection size. Becomes the definition prompt while
//! that is open.

use crate::app::{AppState, PromptMode, SortKey};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

const CURSOR: &str = "▏";

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let line = if state.prompt == PromptMode::Definition {
        definition_prompt(state)
    } else {
        summary_line(state)
    };
    f.render_widget(Paragraph::new(line), area);
}

fn definition_prompt(state: &AppState) -> Line<'_> {
    Line::from(vec![
        Span::styled(
            " Definition id: ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(&state.definition_input, Style::default().fg(Color::White)),
        Span::styled(CURSOR, Style::default().fg(Color::Yellow)),
    ])
}

fn summary_line(state: &AppState) -> Line<'_> {
    let dim = Style::default().fg(Color::DarkGray);
    let sep = || Span::styled(" │ ", dim);
    let mut spans = Vec::new();

    // Search box
    let editing = state.prompt == PromptMode::Search;
    spans.push(Span::styled(
        " / ",
        if editing {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        },
    ));
    if state.search_term.is_empty() && !editing {
        spans.push(Span::styled("search", dim));
    } else {
        spans.push(Span::styled(&state.search_term, Style::default().fg(Color::White)));
    }
    if editing {
        spans.push(Span::styled(CURSOR, Style::default().fg(Color::Yellow)));
    }

    spans.push(sep());
    spans.push(Span::styled("status ", dim));
    spans.push(match &state.status_filter {
        Some(s) => Span::styled(s.as_str(), Style::default().fg(Color::Magenta)),
        None => Span::styled("all", dim),
    });

    spans.push(sep());
    let key = match state.sort_key {
        SortKey::Label => state.config.flavor.label_heading(),
        SortKey::Id => "ID",
    };
    let arrow = if state.sort_ascending { "↑" } else { "↓" };
    spans.push(Span::styled(format!("{key} {arrow}"), Style::default().fg(Color::Cyan)));

    for (status, count) in state.summary_counts() {
        spans.push(sep());
        spans.push(Span::styled(format!("{status} "), dim));
        spans.push(Span::styled(
            count.to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
    }

    spans.push(sep());
    spans.push(Span::styled(
        format!("{}/{} shown", state.visible.len(), state.runs.len()),
        dim,
    ));
    if !state.selected_ids.is_empty() {
        spans.push(Span::styled(
            format!(", {} selected", state.selected_ids.len()),
            Style::default().fg(Color::Green),
        ));
    }
    if !state.pending_cancels.is_empty() {
        spans.push(Span::styled(
            format!(", cancelling {}…", state.pending_cancels.len()),
            Style::default().fg(Color::Yellow),
        ));
    }

    Line::from(spans)
}

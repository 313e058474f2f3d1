use crate::app::PromptMode;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    DismissError,
    MoveUp,
    MoveDown,
    MoveTop,
    MoveBottom,
    ToggleSelect,
    SelectAllVisible,
    ClearSelection,
    StartSearch,
    CycleStatusFilter,
    ClearStatusFilter,
    ToggleSortDirection,
    ToggleSortKey,
    CancelSelected,
    ChangeDefinition,
    Refresh,
    OpenBrowser,
    ShowDetails,
    CloseOverlay,
    ConfirmYes,
    ConfirmNo,
    PromptInput(char),
    PromptBackspace,
    PromptSubmit,
    PromptCancel,
    None,
}

/// Which overlay (if any) is currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayMode {
    #[default]
    None,
    Detail,
    Confirm,
}

/// Captures the UI state needed to interpret a key press.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    pub has_error: bool,
    pub is_loading: bool,
    pub overlay: OverlayMode,
    pub prompt: PromptMode,
}

pub fn map_key(key: KeyEvent, ctx: &InputContext) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match ctx.overlay {
        OverlayMode::Confirm => {
            return match key.code {
                KeyCode::Char('y' | 'Y') | KeyCode::Enter => Action::ConfirmYes,
                KeyCode::Char('n' | 'N' | 'q') | KeyCode::Esc => Action::ConfirmNo,
                _ => Action::None,
            };
        }
        OverlayMode::Detail => {
            return match key.code {
                KeyCode::Char('q' | 'd') | KeyCode::Esc => Action::CloseOverlay,
                KeyCode::Char('o') => Action::OpenBrowser,
                _ => Action::None,
            };
        }
        OverlayMode::None => {}
    }

    match ctx.prompt {
        PromptMode::Search => {
            return match key.code {
                KeyCode::Enter => Action::PromptSubmit,
                KeyCode::Esc => Action::PromptCancel,
                KeyCode::Backspace => Action::PromptBackspace,
                KeyCode::Up => Action::MoveUp,
                KeyCode::Down => Action::MoveDown,
                KeyCode::Char(c) => Action::PromptInput(c),
                _ => Action::None,
            };
        }
        PromptMode::Definition => {
            return match key.code {
                KeyCode::Enter => Action::PromptSubmit,
                KeyCode::Esc => Action::PromptCancel,
                KeyCode::Backspace => Action::PromptBackspace,
                KeyCode::Char(c) if c.is_ascii_digit() => Action::PromptInput(c),
                _ => Action::None,
            };
        }
        PromptMode::None => {}
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => {
            if ctx.has_error {
                Action::DismissError
            } else {
                Action::Quit
            }
        }
        KeyCode::Up | KeyCode::Char('k') => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Action::MoveDown,
        KeyCode::Home | KeyCode::Char('g') => Action::MoveTop,
        KeyCode::End | KeyCode::Char('G') => Action::MoveBottom,
        KeyCode::Char(' ') => Action::ToggleSelect,
        KeyCode::Char('a') => Action::SelectAllVisible,
        KeyCode::Char('A') => Action::ClearSelection,
        KeyCode::Char('/') => Action::StartSearch,
        KeyCode::Char('s') => Action::CycleStatusFilter,
        KeyCode::Char('S') => Action::ClearStatusFilter,
        KeyCode::Char('t') => Action::ToggleSortDirection,
        KeyCode::Char('T') => Action::ToggleSortKey,
        KeyCode::Char('c') => Action::CancelSelected,
        KeyCode::Char('p') => Action::ChangeDefinition,
        KeyCode::Char('r') if !ctx.is_loading => Action::Refresh,
        KeyCode::Char('o') => Action::OpenBrowser,
        KeyCode::Char('d') | KeyCode::Enter => Action::ShowDetails,
        _ => Action::None,
    }
}

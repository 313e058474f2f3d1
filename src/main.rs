use azw::app::{AppConfig, AppState, ConfirmAction};
use azw::azure::AzureClient;
use azw::browser;
use azw::cli::{self, Cli};
use azw::events::{AppEvent, EventHandler};
use azw::input::{self, Action, InputContext, OverlayMode};
use azw::tasks::{self, FetchController};
use azw::traits::RunService;
use azw::tui;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing_subscriber::EnvFilter;

fn setup_verbose_logging() -> Result<()> {
    let state_dir = state_dir_or_fallback();
    std::fs::create_dir_all(&state_dir)
        .map_err(|e| eyre!("Failed to create log directory {state_dir:?}: {e}"))?;
    let log_path = state_dir.join("debug.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eyre!("Failed to open log file {log_path:?}: {e}"))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("azw=debug"));
    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();
    tracing::info!(
        "azw v{} starting with verbose logging",
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}

fn state_dir_or_fallback() -> std::path::PathBuf {
    if let Some(state) = std::env::var_os("XDG_STATE_HOME") {
        std::path::PathBuf::from(state).join("azw")
    } else if let Some(home) = std::env::var_os("HOME") {
        std::path::PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("azw")
    } else {
        std::env::temp_dir().join("azw")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let dotenv = dotenvy::dotenv();
    let args = Cli::parse();

    if args.verbose {
        setup_verbose_logging()?;
    }
    match dotenv {
        Ok(path) => tracing::debug!("loaded environment from {path:?}"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("ignoring unreadable .env: {e}"),
    }

    // Validate before touching the terminal so errors print normally.
    let config = args.azure_config(&cli::pat_from_env())?;
    tracing::info!(?config, definition = ?args.definition, "configuration loaded");
    let flavor = config.flavor;
    let client = AzureClient::new(config)?;
    let target = client.config().display_target();
    let service: Arc<dyn RunService> = Arc::new(client);

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to disable raw mode during panic: {e}");
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, SetTitle("")) {
            eprintln!("Failed to leave alternate screen during panic: {e}");
        }
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, SetTitle(format!("azw {target}")))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut state = AppState::new(
        AppConfig {
            target,
            flavor,
            version_string: format!("azw v{}", env!("CARGO_PKG_VERSION")),
        },
        args.definition,
        args.sort_key(),
    );

    let events = EventHandler::new(Duration::from_millis(100));
    let tx = events.sender();
    let mut fetcher = FetchController::new(service.clone(), tx.clone());
    fetcher.start(state.refresh());

    let result = run_app(&mut terminal, &mut state, events, &tx, &mut fetcher, &service).await;

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, SetTitle(""))?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    mut events: EventHandler,
    tx: &UnboundedSender<AppEvent>,
    fetcher: &mut FetchController,
    service: &Arc<dyn RunService>,
) -> Result<()> {
    loop {
        terminal.draw(|f| tui::render::render(f, state))?;

        state.prune_notifications();
        state.prune_error();

        let Some(event) = events.next().await else {
            tracing::warn!("event channel closed");
            break;
        };
        match event {
            AppEvent::Key(key) => {
                let ctx = InputContext {
                    has_error: state.error.is_some(),
                    is_loading: state.is_loading(),
                    overlay: overlay_mode(state),
                    prompt: state.prompt,
                };
                let action = input::map_key(key, &ctx);
                handle_action(action, state, fetcher, service, tx);
            }
            AppEvent::Tick => {
                if state.is_loading() || !state.pending_cancels.is_empty() {
                    state.advance_spinner();
                }
            }
            AppEvent::FetchResult { ticket, result } => {
                match &result {
                    Ok(runs) => tracing::debug!(?ticket, count = runs.len(), "fetch finished"),
                    Err(e) => tracing::warn!(?ticket, "fetch failed: {e}"),
                }
                state.apply_fetch_result(ticket, result);
            }
            AppEvent::CancelOutcome { run_id, result } => {
                if let Some(summary) = state.apply_cancel_outcome(run_id, result) {
                    tracing::info!(?summary, "cancel batch finished");
                }
            }
            AppEvent::Error(e) => state.set_error(e),
        }

        if state.should_quit {
            break;
        }
    }
    events.stop();
    Ok(())
}

fn overlay_mode(state: &AppState) -> OverlayMode {
    if state.has_confirm_overlay() {
        OverlayMode::Confirm
    } else if state.has_detail_overlay() {
        OverlayMode::Detail
    } else {
        OverlayMode::None
    }
}

fn handle_action(
    action: Action,
    state: &mut AppState,
    fetcher: &mut FetchController,
    service: &Arc<dyn RunService>,
    tx: &UnboundedSender<AppEvent>,
) {
    match action {
        Action::Quit => state.should_quit = true,
        Action::DismissError => state.clear_error(),
        Action::MoveUp => state.move_cursor_up(),
        Action::MoveDown => state.move_cursor_down(),
        Action::MoveTop => state.move_cursor_top(),
        Action::MoveBottom => state.move_cursor_bottom(),
        Action::ToggleSelect => state.toggle_current_selection(),
        Action::SelectAllVisible => state.select_all_visible(),
        Action::ClearSelection => state.clear_selection(),
        Action::StartSearch => state.start_search(),
        Action::CycleStatusFilter => state.cycle_status_filter(),
        Action::ClearStatusFilter => state.set_status_filter(None),
        Action::ToggleSortDirection => state.toggle_sort_direction(),
        Action::ToggleSortKey => state.toggle_sort_key(),
        Action::CancelSelected => state.request_cancel_selected(),
        Action::ConfirmYes => {
            let confirmed = state.confirm_action();
            state.close_overlay();
            if confirmed == Some(ConfirmAction::CancelSelected) {
                let ids = state.begin_cancel();
                if !ids.is_empty() {
                    tracing::info!(?ids, "cancelling runs");
                    tasks::spawn_cancellations(service, ids, tx);
                }
            }
        }
        Action::ConfirmNo | Action::CloseOverlay => state.close_overlay(),
        Action::ChangeDefinition => state.start_definition_prompt(),
        Action::Refresh => fetcher.start(state.refresh()),
        Action::OpenBrowser => {
            match state.current_run().and_then(|r| r.detail_url.clone()) {
                Some(url) => {
                    if let Err(e) = browser::open_in_browser(&url) {
                        tracing::warn!("open browser failed: {e}");
                        state.set_error(e.to_string());
                    }
                }
                None => state.set_error("No link for this run".to_string()),
            }
        }
        Action::ShowDetails => state.open_detail_for_current(),
        Action::PromptInput(c) => state.prompt_input(c),
        Action::PromptBackspace => state.prompt_backspace(),
        Action::PromptSubmit => {
            if let Some(definition_id) = state.submit_prompt() {
                tracing::info!(definition_id, "switching definition");
                fetcher.start(state.begin_fetch(Some(definition_id)));
            }
        }
        Action::PromptCancel => state.cancel_prompt(),
        Action::None => {}
    }
}

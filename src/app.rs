//! Run model, view state, and the filter → sort → select pipeline.

use crate::azure::ApiFlavor;
use chrono::{DateTime, Local};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// ── Shared utility functions ──

/// Unicode-width-aware truncation with ellipsis.
/// Returns `""` when `max_width` is 0.
pub fn truncate(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(s) <= max_width {
        s.to_string()
    } else {
        let mut result = String::new();
        let mut width = 0;
        for c in s.chars() {
            let cw = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            if width + cw + 1 > max_width {
                result.push('\u{2026}');
                break;
            }
            result.push(c);
            width += cw;
        }
        result
    }
}

/// Backfilled when the upstream record carries no status.
pub const UNKNOWN_STATUS: &str = "Unknown";
/// Local status applied once a cancel request has been accepted.
pub const CANCELLING_STATUS: &str = "cancelling";

pub const NOTIFICATION_TTL_SECS: u64 = 5;
/// Must match the length of `FRAMES` in `tui::spinner`.
pub const SPINNER_FRAME_COUNT: usize = 10;
/// Below 80 cols the time columns are dropped.
pub const NARROW_WIDTH_THRESHOLD: u16 = 80;
pub const ERROR_TTL_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionRef {
    pub id: u64,
    pub name: String,
}

/// One run, normalized from whichever upstream shape it came in.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: u64,
    /// Pipeline run name or build number, depending on the API flavor.
    pub label: String,
    pub status: String,
    pub result: Option<String>,
    pub queue_time: Option<String>,
    pub start_time: Option<String>,
    pub detail_url: Option<String>,
    pub definition: Option<DefinitionRef>,
    pub repository: Option<String>,
    pub requested_for: Option<String>,
}

impl RunRecord {
    /// `needle` must already be lowercased.
    fn label_contains(&self, needle: &str) -> bool {
        needle.is_empty() || self.label.to_lowercase().contains(needle)
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.status.to_lowercase() == status.to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortKey {
    Label,
    Id,
}

impl SortKey {
    pub fn toggled(self) -> Self {
        match self {
            Self::Label => Self::Id,
            Self::Id => Self::Label,
        }
    }
}

/// Primary collation key: NFD with combining marks stripped, then lowercased,
/// so "Échelle" sorts next to "echelle" instead of after "z".
fn collation_key(label: &str) -> String {
    label
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Ascending order for `key`. Labels compare by base letters first, then by
/// accents and case, then the raw label and the id, so the order is total and
/// descending is its exact reverse.
pub fn compare_runs(a: &RunRecord, b: &RunRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Label => collation_key(&a.label)
            .cmp(&collation_key(&b.label))
            .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()))
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.id.cmp(&b.id)),
        SortKey::Id => a.id.cmp(&b.id).then_with(|| a.label.cmp(&b.label)),
    }
}

/// Indices of `runs` whose label contains `search` (case-insensitive) and,
/// when `status` is set, whose status equals it (case-insensitive).
/// Upstream order is preserved.
pub fn filter_runs(runs: &[RunRecord], search: &str, status: Option<&str>) -> Vec<usize> {
    let needle = search.to_lowercase();
    runs.iter()
        .enumerate()
        .filter(|(_, r)| r.label_contains(&needle))
        .filter(|(_, r)| status.map_or(true, |s| r.has_status(s)))
        .map(|(i, _)| i)
        .collect()
}

pub fn sort_indices(runs: &[RunRecord], indices: &mut [usize], key: SortKey, ascending: bool) {
    indices.sort_by(|&a, &b| {
        let ord = compare_runs(&runs[a], &runs[b], key);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Identifies one fetch. Results carrying an outdated ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub definition_id: Option<u32>,
}

/// Why the table has no rows. Each case renders differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    Loading,
    LoadFailed,
    NoRuns,
    NoMatches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Text entry modes that capture printable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    #[default]
    None,
    Search,
    Definition,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub timestamp: Instant,
}

pub struct DetailOverlay {
    pub title: String,
    pub lines: Vec<(String, String)>,
}

pub struct ConfirmOverlay {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    CancelSelected,
}

/// At most one overlay active at a time. A new overlay replaces the previous.
pub enum ActiveOverlay {
    None,
    Detail(DetailOverlay),
    Confirm(ConfirmOverlay),
}

/// Immutable configuration set at startup.
pub struct AppConfig {
    /// `<org>/<project>`
    pub target: String,
    pub flavor: ApiFlavor,
    pub version_string: String,
}

pub struct AppState {
    pub config: AppConfig,

    // Run data, in upstream order
    pub runs: Vec<RunRecord>,

    // View state
    pub search_term: String,
    pub status_filter: Option<String>,
    pub sort_key: SortKey,
    pub sort_ascending: bool,
    /// Always a subset of the ids in `runs`.
    pub selected_ids: BTreeSet<u64>,

    /// Indices into `runs`, filtered and sorted. Rebuilt by `rebuild_view()`.
    pub visible: Vec<usize>,
    pub cursor: usize,

    // Fetch lifecycle
    pub definition_id: Option<u32>,
    pub load: LoadState,
    pub fetch_generation: u64,
    pub last_fetch: Option<DateTime<Local>>,

    // Cancellation
    pub pending_cancels: BTreeSet<u64>,
    /// Per-id outcomes of the current (or last finished) cancel batch.
    pub cancel_report: BTreeMap<u64, Result<(), String>>,
    /// Rows shown with a ⚠ until a cancel succeeds or the run leaves the list.
    pub run_errors: HashMap<u64, String>,

    // Prompt
    pub prompt: PromptMode,
    pub definition_input: String,

    // Transient UI
    pub overlay: ActiveOverlay,
    pub notifications: Vec<Notification>,
    pub error: Option<(String, Instant)>,
    pub spinner_frame: usize,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(config: AppConfig, definition_id: Option<u32>, sort_key: SortKey) -> Self {
        Self {
            config,
            runs: Vec::new(),
            search_term: String::new(),
            status_filter: None,
            sort_key,
            sort_ascending: true,
            selected_ids: BTreeSet::new(),
            visible: Vec::new(),
            cursor: 0,
            definition_id,
            load: LoadState::Idle,
            fetch_generation: 0,
            last_fetch: None,
            pending_cancels: BTreeSet::new(),
            cancel_report: BTreeMap::new(),
            run_errors: HashMap::new(),
            prompt: PromptMode::None,
            definition_input: String::new(),
            overlay: ActiveOverlay::None,
            notifications: Vec::new(),
            error: None,
            spinner_frame: 0,
            should_quit: false,
        }
    }

    /// Recompute `visible` from the runs and the view state, then clamp the cursor.
    pub fn rebuild_view(&mut self) {
        let mut indices = filter_runs(&self.runs, &self.search_term, self.status_filter.as_deref());
        sort_indices(&self.runs, &mut indices, self.sort_key, self.sort_ascending);
        self.visible = indices;
        if self.visible.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.visible.len() {
            self.cursor = self.visible.len() - 1;
        }
    }

    pub fn visible_runs(&self) -> impl Iterator<Item = &RunRecord> {
        self.visible.iter().filter_map(move |&i| self.runs.get(i))
    }

    pub fn visible_ids(&self) -> Vec<u64> {
        self.visible_runs().map(|r| r.id).collect()
    }

    pub fn current_run(&self) -> Option<&RunRecord> {
        self.visible.get(self.cursor).and_then(|&i| self.runs.get(i))
    }

    /// Visible runs whose status equals `status` (case-insensitive).
    pub fn status_count(&self, status: &str) -> usize {
        self.visible_runs().filter(|r| r.has_status(status)).count()
    }

    pub fn summary_counts(&self) -> Vec<(&'static str, usize)> {
        self.config
            .flavor
            .summary_statuses()
            .into_iter()
            .map(|s| (s, self.status_count(s)))
            .collect()
    }

    pub fn empty_reason(&self) -> Option<EmptyReason> {
        if !self.visible.is_empty() {
            return None;
        }
        if !self.runs.is_empty() {
            return Some(EmptyReason::NoMatches);
        }
        Some(match self.load {
            LoadState::Idle | LoadState::Loading => EmptyReason::Loading,
            LoadState::Failed(_) => EmptyReason::LoadFailed,
            LoadState::Loaded => EmptyReason::NoRuns,
        })
    }

    // --- Search / status / sort ---

    pub fn set_search_term(&mut self, text: &str) {
        self.search_term = text.to_string();
        self.rebuild_view();
    }

    pub fn set_status_filter(&mut self, status: Option<&str>) {
        self.status_filter = status.map(str::to_string);
        self.rebuild_view();
    }

    /// none → each of the flavor's options in turn → none.
    pub fn cycle_status_filter(&mut self) {
        let options = self.config.flavor.status_options();
        let next = match &self.status_filter {
            None => options.first().copied(),
            Some(current) => options
                .iter()
                .position(|o| o.eq_ignore_ascii_case(current))
                .and_then(|i| options.get(i + 1).copied()),
        };
        self.set_status_filter(next);
    }

    pub fn toggle_sort_direction(&mut self) {
        self.sort_ascending = !self.sort_ascending;
        self.rebuild_view();
    }

    pub fn toggle_sort_key(&mut self) {
        self.sort_key = self.sort_key.toggled();
        self.rebuild_view();
    }

    // --- Selection ---

    /// Ids that are not part of the current runs are never added.
    pub fn toggle_selection(&mut self, id: u64, checked: bool) {
        if checked {
            if self.runs.iter().any(|r| r.id == id) {
                self.selected_ids.insert(id);
            }
        } else {
            self.selected_ids.remove(&id);
        }
    }

    pub fn toggle_current_selection(&mut self) {
        if let Some(id) = self.current_run().map(|r| r.id) {
            let checked = !self.selected_ids.contains(&id);
            self.toggle_selection(id, checked);
        }
    }

    pub fn select_all_visible(&mut self) {
        let ids = self.visible_ids();
        self.selected_ids.extend(ids);
    }

    pub fn clear_selection(&mut self) {
        self.selected_ids.clear();
    }

    pub fn is_selected(&self, id: u64) -> bool {
        self.selected_ids.contains(&id)
    }

    // --- Cursor ---

    pub fn move_cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_cursor_down(&mut self) {
        if !self.visible.is_empty() && self.cursor < self.visible.len() - 1 {
            self.cursor += 1;
        }
    }

    pub fn move_cursor_top(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_bottom(&mut self) {
        self.cursor = self.visible.len().saturating_sub(1);
    }

    // --- Fetch lifecycle ---

    /// Start a fetch for `definition_id` and return its ticket. Switching to a
    /// different definition drops the old runs and everything keyed by them.
    pub fn begin_fetch(&mut self, definition_id: Option<u32>) -> FetchTicket {
        if definition_id != self.definition_id {
            self.definition_id = definition_id;
            self.runs.clear();
            self.selected_ids.clear();
            self.run_errors.clear();
            self.cancel_report.clear();
            self.pending_cancels.clear();
            self.cursor = 0;
            self.rebuild_view();
        }
        self.fetch_generation += 1;
        self.load = LoadState::Loading;
        FetchTicket {
            generation: self.fetch_generation,
            definition_id: self.definition_id,
        }
    }

    pub fn refresh(&mut self) -> FetchTicket {
        self.begin_fetch(self.definition_id)
    }

    /// Apply a fetch result. Returns `false` when the ticket is stale and the
    /// result was discarded.
    ///
    /// A failure keeps whatever runs are already shown; the error banner marks
    /// them as stale.
    pub fn apply_fetch_result(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<RunRecord>, String>,
    ) -> bool {
        if ticket.generation != self.fetch_generation || ticket.definition_id != self.definition_id
        {
            tracing::warn!(?ticket, current = self.fetch_generation, "discarding stale fetch");
            return false;
        }
        match result {
            Ok(runs) => {
                self.runs = runs;
                let ids: BTreeSet<u64> = self.runs.iter().map(|r| r.id).collect();
                self.selected_ids.retain(|id| ids.contains(id));
                self.run_errors.retain(|id, _| ids.contains(id));
                self.load = LoadState::Loaded;
                self.last_fetch = Some(Local::now());
            }
            Err(msg) => {
                self.load = LoadState::Failed(msg);
            }
        }
        self.rebuild_view();
        true
    }

    pub fn is_loading(&self) -> bool {
        self.load == LoadState::Loading
    }

    pub fn load_error(&self) -> Option<&str> {
        match &self.load {
            LoadState::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    // --- Cancellation ---

    /// Ask for confirmation before cancelling the selection.
    pub fn request_cancel_selected(&mut self) {
        let count = self.selected_ids.len();
        if count == 0 {
            self.set_error("No runs selected".to_string());
            return;
        }
        let noun = if count == 1 { "run" } else { "runs" };
        self.open_confirm_overlay(
            "Confirm Cancel".to_string(),
            format!("Cancel {count} selected {noun}?"),
            ConfirmAction::CancelSelected,
        );
    }

    /// Mark every selected id that is not already in flight as pending and
    /// return them, in ascending order.
    pub fn begin_cancel(&mut self) -> Vec<u64> {
        if self.pending_cancels.is_empty() {
            self.cancel_report.clear();
        }
        let ids: Vec<u64> = self
            .selected_ids
            .iter()
            .filter(|id| !self.pending_cancels.contains(id))
            .copied()
            .collect();
        self.pending_cancels.extend(ids.iter().copied());
        ids
    }

    /// Record one cancellation outcome. Succeeded ids leave the selection;
    /// failed ids stay selected and get an error marker. Returns the batch
    /// summary once the last pending outcome is in.
    pub fn apply_cancel_outcome(
        &mut self,
        run_id: u64,
        result: Result<(), String>,
    ) -> Option<CancelSummary> {
        // Outcomes for a batch dropped by a definition switch.
        if !self.pending_cancels.remove(&run_id) {
            tracing::debug!(run_id, "ignoring cancel outcome outside the current batch");
            return None;
        }
        match &result {
            Ok(()) => {
                self.selected_ids.remove(&run_id);
                self.run_errors.remove(&run_id);
                if let Some(run) = self.runs.iter_mut().find(|r| r.id == run_id) {
                    run.status = CANCELLING_STATUS.to_string();
                }
            }
            Err(e) => {
                self.run_errors.insert(run_id, e.clone());
            }
        }
        self.cancel_report.insert(run_id, result);
        self.rebuild_view();

        if !self.pending_cancels.is_empty() {
            return None;
        }
        let failed = self.cancel_report.values().filter(|r| r.is_err()).count();
        let summary = CancelSummary {
            succeeded: self.cancel_report.len() - failed,
            failed,
        };
        let message = if summary.failed == 0 {
            format!("Cancelled {} run(s)", summary.succeeded)
        } else {
            format!(
                "Cancelled {} run(s), {} failed",
                summary.succeeded, summary.failed
            )
        };
        self.add_notification(message);
        Some(summary)
    }

    // --- Prompt ---

    pub fn start_search(&mut self) {
        self.prompt = PromptMode::Search;
    }

    pub fn start_definition_prompt(&mut self) {
        self.definition_input = self
            .definition_id
            .map(|d| d.to_string())
            .unwrap_or_default();
        self.prompt = PromptMode::Definition;
    }

    pub fn prompt_input(&mut self, c: char) {
        match self.prompt {
            PromptMode::Search => {
                self.search_term.push(c);
                self.rebuild_view();
            }
            PromptMode::Definition => {
                if c.is_ascii_digit() {
                    self.definition_input.push(c);
                }
            }
            PromptMode::None => {}
        }
    }

    pub fn prompt_backspace(&mut self) {
        match self.prompt {
            PromptMode::Search => {
                self.search_term.pop();
                self.rebuild_view();
            }
            PromptMode::Definition => {
                self.definition_input.pop();
            }
            PromptMode::None => {}
        }
    }

    /// Leave the prompt. For the definition prompt, returns the new id when
    /// it parsed and differs from the current one.
    pub fn submit_prompt(&mut self) -> Option<u32> {
        let mode = std::mem::take(&mut self.prompt);
        if mode != PromptMode::Definition {
            return None;
        }
        match self.definition_input.trim().parse::<u32>() {
            Ok(id) if id > 0 => (Some(id) != self.definition_id).then_some(id),
            _ => {
                self.set_error(format!(
                    "Invalid definition id '{}': must be a positive integer",
                    self.definition_input
                ));
                None
            }
        }
    }

    /// Esc in search mode clears the term; in the definition prompt it just
    /// discards the input.
    pub fn cancel_prompt(&mut self) {
        match std::mem::take(&mut self.prompt) {
            PromptMode::Search => self.set_search_term(""),
            PromptMode::Definition => self.definition_input.clear(),
            PromptMode::None => {}
        }
    }

    // --- Overlays ---

    pub fn close_overlay(&mut self) {
        self.overlay = ActiveOverlay::None;
    }

    pub fn has_detail_overlay(&self) -> bool {
        matches!(self.overlay, ActiveOverlay::Detail(_))
    }

    pub fn has_confirm_overlay(&self) -> bool {
        matches!(self.overlay, ActiveOverlay::Confirm(_))
    }

    pub fn confirm_action(&self) -> Option<ConfirmAction> {
        if let ActiveOverlay::Confirm(ref overlay) = self.overlay {
            Some(overlay.action)
        } else {
            None
        }
    }

    pub fn open_confirm_overlay(&mut self, title: String, message: String, action: ConfirmAction) {
        self.overlay = ActiveOverlay::Confirm(ConfirmOverlay {
            title,
            message,
            action,
        });
    }

    pub fn open_detail_for_current(&mut self) {
        let Some(run) = self.current_run() else {
            return;
        };
        let title = format!("{} #{}", run.label, run.id);
        let mut lines = vec![
            ("ID".to_string(), run.id.to_string()),
            (
                self.config.flavor.label_heading().to_string(),
                run.label.clone(),
            ),
            ("Status".to_string(), run.status.clone()),
        ];
        let optional = [
            ("Result", run.result.clone()),
            (
                "Definition",
                run.definition
                    .as_ref()
                    .map(|d| format!("{} (#{})", d.name, d.id)),
            ),
            ("Repository", run.repository.clone()),
            ("Requested for", run.requested_for.clone()),
            ("Queued", run.queue_time.clone()),
            ("Started", run.start_time.clone()),
            ("Link", run.detail_url.clone()),
            ("Cancel error", self.run_errors.get(&run.id).cloned()),
        ];
        lines.extend(
            optional
                .into_iter()
                .filter_map(|(label, value)| value.map(|v| (label.to_string(), v))),
        );
        self.overlay = ActiveOverlay::Detail(DetailOverlay { title, lines });
    }

    // --- Transient UI ---

    pub fn add_notification(&mut self, message: String) {
        self.notifications.push(Notification {
            message,
            timestamp: Instant::now(),
        });
    }

    pub fn prune_notifications(&mut self) {
        let now = Instant::now();
        self.notifications
            .retain(|n| now.duration_since(n.timestamp).as_secs() < NOTIFICATION_TTL_SECS);
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAME_COUNT;
    }

    pub fn set_error(&mut self, msg: String) {
        self.error = Some((msg, Instant::now()));
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn prune_error(&mut self) {
        if let Some((_, ts)) = &self.error {
            if ts.elapsed().as_secs() >= ERROR_TTL_SECS {
                self.error = None;
            }
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(msg, _)| msg.as_str())
    }
}

//! Reconciler state machine.
//!
//! # Overview
//!
//! [`App`] owns everything the interactive view shows: the duplicate groups
//! received so far, the cursor, the selection and the current [`AppMode`].
//! It changes only through [`App::update`], which the control loop calls
//! for every [`Event`] taken off its channel. Work that must not block the
//! loop (deleting files, stopping the pipeline) is returned as a
//! [`Command`] for the caller to carry out.
//!
//! ```text
//! Scanning ──first group──▶ Browsing ◀──n/Esc── Confirming
//!    │                       │  ▲  └────d──────────▲
//!    │                       │  └──result── Deleting ◀─y─┘
//!    └───────q───────▶ Quitting ◀───q───┘
//! ```
//!
//! # Example
//!
//! ```
//! use dupewalk::duplicates::DuplicateGroup;
//! use dupewalk::scanner::Fingerprint;
//! use dupewalk::tui::app::{Action, App, AppMode, Command, Event};
//! use std::path::PathBuf;
//!
//! let mut app = App::new();
//! app.update(Event::Group(DuplicateGroup::new(
//!     5,
//!     Fingerprint::from("aa"),
//!     vec![PathBuf::from("/a"), PathBuf::from("/b")],
//! )));
//! assert_eq!(app.mode(), AppMode::Browsing);
//!
//! app.update(Event::Action(Action::NavigateDown));
//! app.update(Event::Action(Action::ToggleSelect));
//! app.update(Event::Action(Action::Delete));
//! let command = app.update(Event::Action(Action::Confirm));
//! assert_eq!(command, Some(Command::DeleteFiles(vec![PathBuf::from("/b")])));
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crossterm::event::KeyEvent;

use super::events::action_for;
use super::theme::Theme;
use crate::actions::{preserves_copy, BatchDeleteResult};
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::progress::ScanProgress;

/// Reconciler mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Waiting for the first group
    #[default]
    Scanning,
    /// Navigating groups and selecting files
    Browsing,
    /// Deletion prompt is open
    Confirming,
    /// A deletion batch is running
    Deleting,
    /// Terminal state
    Quitting,
}

impl AppMode {
    /// Modes in which `q` quits.
    #[must_use]
    pub fn can_quit(&self) -> bool {
        matches!(self, Self::Scanning | Self::Browsing)
    }

    /// Whether this is the terminal mode.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Quitting)
    }
}

/// User intention decoded from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move the cursor up one file.
    NavigateUp,
    /// Move the cursor down one file.
    NavigateDown,
    /// Jump to the previous group.
    PreviousGroup,
    /// Jump to the next group.
    NextGroup,
    /// Select or deselect the file under the cursor.
    ToggleSelect,
    /// Ask to delete the selected files.
    Delete,
    /// Accept the open prompt.
    Confirm,
    /// Dismiss the open prompt or message.
    Cancel,
    /// Leave the session.
    Quit,
}

/// Input to the control loop.
#[derive(Debug)]
pub enum Event {
    /// A verified group arrived from the pipeline.
    Group(DuplicateGroup),
    /// The group stream closed.
    ScanComplete(ScanSummary),
    /// Raw key press; decoded against the current mode.
    Key(KeyEvent),
    /// Already-decoded action.
    Action(Action),
    /// Terminal resized to (columns, rows).
    Resize(u16, u16),
    /// Periodic progress sample.
    Tick(ScanProgress),
    /// A deletion batch finished.
    Deleted(BatchDeleteResult),
    /// Input is gone or a shutdown was requested; leave immediately.
    Terminate,
}

/// Side effect requested by [`App::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Delete these files off the control loop and report back.
    DeleteFiles(Vec<PathBuf>),
    /// Stop the pipeline and exit.
    Quit,
}

/// Rows used by header, footer, group title and borders.
const CHROME_ROWS: u16 = 9;

/// Reconciler state.
#[derive(Debug, Clone)]
pub struct App {
    mode: AppMode,
    groups: Vec<DuplicateGroup>,
    group_index: usize,
    file_index: usize,
    file_scroll: usize,
    visible_rows: usize,
    selected: HashSet<PathBuf>,
    pending: Vec<PathBuf>,
    progress: ScanProgress,
    summary: Option<ScanSummary>,
    error: Option<String>,
    status: Option<String>,
    theme: Theme,
    use_trash: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Create an app in Scanning mode with no groups.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: AppMode::Scanning,
            groups: Vec::new(),
            group_index: 0,
            file_index: 0,
            file_scroll: 0,
            visible_rows: 20,
            selected: HashSet::new(),
            pending: Vec::new(),
            progress: ScanProgress::new(),
            summary: None,
            error: None,
            status: None,
            theme: Theme::default(),
            use_trash: false,
        }
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Whether confirmed files go to the trash (affects prompt wording only).
    #[must_use]
    pub fn with_trash(mut self, use_trash: bool) -> Self {
        self.use_trash = use_trash;
        self
    }

    // ==================== Accessors ====================

    /// Get the current application mode.
    #[must_use]
    pub fn mode(&self) -> AppMode {
        self.mode
    }

    /// Whether the session has ended.
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.mode.is_done()
    }

    /// Groups received so far, minus those emptied by deletion.
    #[must_use]
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Number of groups on screen.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Index of the group under the cursor.
    #[must_use]
    pub fn group_index(&self) -> usize {
        self.group_index
    }

    /// Index of the cursor within the current group.
    #[must_use]
    pub fn file_index(&self) -> usize {
        self.file_index
    }

    /// First visible row of the file list.
    #[must_use]
    pub fn file_scroll(&self) -> usize {
        self.file_scroll
    }

    /// Group under the cursor.
    #[must_use]
    pub fn current_group(&self) -> Option<&DuplicateGroup> {
        self.groups.get(self.group_index)
    }

    /// File under the cursor.
    #[must_use]
    pub fn current_file(&self) -> Option<&PathBuf> {
        self.current_group()
            .and_then(|g| g.files.get(self.file_index))
    }

    /// Files marked for deletion.
    #[must_use]
    pub fn selected(&self) -> &HashSet<PathBuf> {
        &self.selected
    }

    /// Whether `path` is marked for deletion.
    #[must_use]
    pub fn is_selected(&self, path: &PathBuf) -> bool {
        self.selected.contains(path)
    }

    /// Files awaiting confirmation or being deleted, sorted.
    #[must_use]
    pub fn pending(&self) -> &[PathBuf] {
        &self.pending
    }

    /// Bytes the pending files occupy.
    #[must_use]
    pub fn pending_size(&self) -> u64 {
        self.pending
            .iter()
            .filter_map(|p| self.groups.iter().find(|g| g.contains(p)).map(|g| g.size))
            .sum()
    }

    /// Groups whose every copy is in the pending set.
    #[must_use]
    pub fn groups_losing_all_copies(&self) -> usize {
        let pending: HashSet<PathBuf> = self.pending.iter().cloned().collect();
        self.groups
            .iter()
            .filter(|g| !preserves_copy(&g.files, &pending))
            .count()
    }

    /// Live scan counters.
    #[must_use]
    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }

    /// Summary, once the stream has closed.
    #[must_use]
    pub fn summary(&self) -> Option<&ScanSummary> {
        self.summary.as_ref()
    }

    /// Whether the group stream has closed.
    #[must_use]
    pub fn scan_complete(&self) -> bool {
        self.summary.is_some()
    }

    /// Error overlay text, if one is showing.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Outcome of the last deletion batch.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Colors used by the renderer.
    #[must_use]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Whether deletions go to the trash.
    #[must_use]
    pub fn use_trash(&self) -> bool {
        self.use_trash
    }

    /// Bytes freed by keeping one copy of every group.
    #[must_use]
    pub fn reclaimable_space(&self) -> u64 {
        self.groups.iter().map(DuplicateGroup::wasted_space).sum()
    }

    // ==================== Event Handling ====================

    /// Apply one event, returning any side effect the caller must perform.
    pub fn update(&mut self, event: Event) -> Option<Command> {
        match event {
            Event::Group(group) => {
                self.push_group(group);
                None
            }
            Event::ScanComplete(summary) => {
                log::info!(
                    "Scan complete: {} groups, {} reclaimable",
                    summary.duplicate_groups,
                    summary.reclaimable_display()
                );
                self.summary = Some(summary);
                None
            }
            Event::Key(key) => {
                if self.error.take().is_some() {
                    return None;
                }
                action_for(&key, self.mode).and_then(|action| self.handle_action(action))
            }
            Event::Action(action) => {
                if self.error.take().is_some() {
                    return None;
                }
                self.handle_action(action)
            }
            Event::Resize(_, rows) => {
                self.set_visible_rows(rows.saturating_sub(CHROME_ROWS) as usize);
                None
            }
            Event::Tick(progress) => {
                self.progress = progress;
                None
            }
            Event::Deleted(result) => {
                self.apply_deletion(&result);
                None
            }
            Event::Terminate => {
                self.set_mode(AppMode::Quitting);
                Some(Command::Quit)
            }
        }
    }

    fn handle_action(&mut self, action: Action) -> Option<Command> {
        log::trace!("Action {:?} in {:?}", action, self.mode);
        match (self.mode, action) {
            (mode, Action::Quit) if mode.can_quit() => {
                self.set_mode(AppMode::Quitting);
                Some(Command::Quit)
            }
            (AppMode::Browsing, Action::NavigateUp) => {
                self.previous_file();
                None
            }
            (AppMode::Browsing, Action::NavigateDown) => {
                self.next_file();
                None
            }
            (AppMode::Browsing, Action::PreviousGroup) => {
                self.previous_group();
                None
            }
            (AppMode::Browsing, Action::NextGroup) => {
                self.next_group();
                None
            }
            (AppMode::Browsing, Action::ToggleSelect) => {
                self.toggle_select();
                None
            }
            (AppMode::Browsing, Action::Delete) => {
                if !self.selected.is_empty() {
                    let mut pending: Vec<PathBuf> = self.selected.iter().cloned().collect();
                    pending.sort();
                    self.pending = pending;
                    self.set_mode(AppMode::Confirming);
                }
                None
            }
            (AppMode::Confirming, Action::Confirm) => {
                self.set_mode(AppMode::Deleting);
                Some(Command::DeleteFiles(self.pending.clone()))
            }
            (AppMode::Confirming, Action::Cancel) => {
                self.pending.clear();
                self.selected.clear();
                self.set_mode(AppMode::Browsing);
                None
            }
            _ => None,
        }
    }

    fn set_mode(&mut self, mode: AppMode) {
        if self.mode != mode {
            log::debug!("Mode transition: {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    // ==================== Groups ====================

    fn push_group(&mut self, group: DuplicateGroup) {
        log::debug!("Received group of {} files ({} bytes each)", group.len(), group.size);
        self.groups.push(group);
        if self.mode == AppMode::Scanning {
            self.set_mode(AppMode::Browsing);
        }
    }

    fn apply_deletion(&mut self, result: &BatchDeleteResult) {
        let removed: HashSet<&Path> = result.deleted_paths().collect();
        // The file under the cursor, else the nearest survivor below it,
        // else the nearest above.
        let anchor = self.current_group().and_then(|g| {
            let split = self.file_index.min(g.files.len());
            let (above, below) = g.files.split_at(split);
            below
                .iter()
                .chain(above.iter().rev())
                .find(|f| !removed.contains(f.as_path()))
                .cloned()
        });
        for deleted in &removed {
            if let Some(group) = self.groups.iter_mut().find(|g| g.contains(deleted)) {
                group.remove(deleted);
            }
        }
        self.groups.retain(DuplicateGroup::is_duplicate);
        self.restore_cursor(anchor.as_deref());

        self.selected.clear();
        self.pending.clear();
        self.status = Some(result.summary());
        if !result.all_succeeded() {
            let mut message = format!("{} file(s) could not be deleted:", result.failure_count());
            for (path, reason) in &result.failures {
                message.push_str(&format!("\n{}: {}", path.display(), reason));
            }
            self.error = Some(message);
        }

        if self.mode == AppMode::Deleting {
            self.set_mode(AppMode::Browsing);
        }
    }

    // ==================== Navigation ====================

    fn set_visible_rows(&mut self, rows: usize) {
        self.visible_rows = rows.max(1);
        self.update_file_scroll();
    }

    fn next_file(&mut self) {
        if let Some(group) = self.current_group() {
            if self.file_index + 1 < group.len() {
                self.file_index += 1;
                self.update_file_scroll();
            }
        }
    }

    fn previous_file(&mut self) {
        if self.file_index > 0 {
            self.file_index -= 1;
            self.update_file_scroll();
        }
    }

    fn next_group(&mut self) {
        if self.group_index + 1 < self.groups.len() {
            self.group_index += 1;
            self.file_index = 0;
            self.file_scroll = 0;
        }
    }

    fn previous_group(&mut self) {
        if self.group_index > 0 {
            self.group_index -= 1;
            self.file_index = 0;
            self.file_scroll = 0;
        }
    }

    /// Put the cursor back on `anchor` if its group survived, otherwise
    /// move to the first file of the nearest group.
    fn restore_cursor(&mut self, anchor: Option<&Path>) {
        let located = anchor.and_then(|a| {
            self.groups.iter().enumerate().find_map(|(index, g)| {
                g.files.iter().position(|f| f == a).map(|file| (index, file))
            })
        });
        match located {
            Some((group, file)) => {
                self.group_index = group;
                self.file_index = file;
            }
            None => {
                self.group_index = self.group_index.min(self.groups.len().saturating_sub(1));
                self.file_index = 0;
                self.file_scroll = 0;
            }
        }
        self.update_file_scroll();
    }

    fn update_file_scroll(&mut self) {
        if self.file_index >= self.file_scroll + self.visible_rows {
            self.file_scroll = self.file_index + 1 - self.visible_rows;
        }
        if self.file_index < self.file_scroll {
            self.file_scroll = self.file_index;
        }
    }

    // ==================== Selection ====================

    fn toggle_select(&mut self) {
        if let Some(path) = self.current_file().cloned() {
            if !self.selected.remove(&path) {
                log::debug!("Selected: {}", path.display());
                self.selected.insert(path);
            }
        }
    }
}

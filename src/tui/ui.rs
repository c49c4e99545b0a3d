//! Rendering of the reconciler view.
//!
//! [`render`] is a pure function of [`App`]: it reads state and draws,
//! never mutating anything. Layout, top to bottom:
//!
//! - header (title, group count, reclaimable space, scan state)
//! - content (scan progress, or the current group's files)
//! - status line (selection count or last deletion outcome)
//! - footer (keys available in the current mode)
//!
//! Confirmation, deletion and error dialogs are drawn over the content.

use bytesize::ByteSize;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::app::{App, AppMode};

/// Files listed in the confirmation dialog before eliding the rest.
const CONFIRM_PREVIEW_FILES: usize = 5;

fn block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
}

fn titled_block<'a>(title: impl Into<Line<'a>>) -> Block<'a> {
    block().title(title)
}

/// Draw the whole view for the current state.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    render_content(frame, app, chunks[1]);
    render_status(frame, app, chunks[2]);
    render_footer(frame, app, chunks[3]);

    match app.mode() {
        AppMode::Confirming => render_confirm_dialog(frame, app, area),
        AppMode::Deleting => render_deleting_dialog(frame, app, area),
        _ => {}
    }

    if app.error_message().is_some() {
        render_error_dialog(frame, app, area);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let mut text = String::from("dupewalk");
    match app.mode() {
        AppMode::Confirming => text.push_str(" [Confirm Delete]"),
        AppMode::Deleting => text.push_str(" [Deleting]"),
        AppMode::Quitting => text.push_str(" [Quitting]"),
        AppMode::Scanning | AppMode::Browsing => {}
    }

    text.push_str(&format!(
        " | {} group(s), {} reclaimable",
        app.group_count(),
        format_size(app.reclaimable_space())
    ));
    if app.scan_complete() {
        text.push_str(" | scan complete");
    } else {
        text.push_str(" | scanning...");
    }
    if let Some(summary) = app.summary().filter(|s| s.had_errors()) {
        text.push_str(&format!(
            " | skipped {} bucket(s), {} set(s)",
            summary.buckets_failed, summary.candidate_sets_failed
        ));
    }

    let header = Paragraph::new(text)
        .style(Style::default().fg(theme.primary).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(block().border_style(Style::default().fg(theme.primary)));
    frame.render_widget(header, area);
}

fn render_content(frame: &mut Frame, app: &App, area: Rect) {
    if app.current_group().is_some() {
        render_group(frame, app, area);
    } else if app.scan_complete() {
        let message = Paragraph::new("No duplicate files found.")
            .style(Style::default().fg(app.theme().success))
            .alignment(Alignment::Center)
            .block(titled_block("Results"));
        frame.render_widget(message, area);
    } else {
        render_progress(frame, app, area);
    }
}

fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let progress = app.progress();

    let outer = titled_block("Scanning").border_style(Style::default().fg(theme.dim));
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Phase
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Path
            Constraint::Min(0),
        ])
        .split(inner);

    let phase = if progress.phase.is_empty() {
        "Scanning for duplicates...".to_string()
    } else {
        format!(
            "Phase: {} ({} hashed)",
            progress.phase,
            format_size(progress.bytes)
        )
    };
    frame.render_widget(
        Paragraph::new(phase)
            .style(Style::default().fg(theme.normal))
            .alignment(Alignment::Center),
        chunks[0],
    );

    let label = if progress.total > 0 {
        format!("{}/{}", progress.current, progress.total)
    } else {
        format!("{}", progress.current)
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(theme.success).bg(theme.dim))
        .percent(progress.percentage())
        .label(label);
    frame.render_widget(gauge, chunks[1]);

    let path = truncate_path(&progress.current_path, chunks[2].width as usize);
    frame.render_widget(
        Paragraph::new(path)
            .style(Style::default().fg(theme.dim))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn render_group(frame: &mut Frame, app: &App, area: Rect) {
    let Some(group) = app.current_group() else {
        return;
    };
    let theme = app.theme();

    let title = format!(
        "Group {}/{} ({} files, {} each)",
        app.group_index() + 1,
        app.group_count(),
        group.len(),
        format_size(group.size)
    );
    let rows = area.height.saturating_sub(2) as usize;
    let width = area.width.saturating_sub(10) as usize;

    let items: Vec<ListItem> = group
        .files
        .iter()
        .enumerate()
        .skip(app.file_scroll())
        .take(rows)
        .map(|(i, path)| {
            let selected = app.is_selected(path);
            let cursor = i == app.file_index();

            let marker = if selected { "[x]" } else { "[ ]" };
            let pointer = if cursor { ">" } else { " " };
            let mut spans = vec![
                Span::raw(format!("{pointer} {marker} ")),
                Span::raw(truncate_path(&path.to_string_lossy(), width)),
            ];
            if selected {
                spans.push(Span::styled(
                    " (marked for deletion)",
                    Style::default().fg(theme.danger),
                ));
            }

            let style = match (cursor, selected) {
                (true, _) => Style::default()
                    .fg(theme.inverted_fg)
                    .bg(if selected { theme.danger } else { theme.primary })
                    .add_modifier(Modifier::BOLD),
                (false, true) => Style::default().fg(theme.secondary),
                (false, false) => Style::default().fg(theme.normal),
            };
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(titled_block(title).border_style(Style::default().fg(theme.primary)));
    frame.render_widget(list, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let count = app.selected().len();
    let line = if count > 0 {
        Span::styled(
            format!(" {count} file(s) selected"),
            Style::default().fg(theme.secondary),
        )
    } else if let Some(status) = app.status() {
        Span::styled(format!(" {status}"), Style::default().fg(theme.success))
    } else {
        Span::raw("")
    };
    frame.render_widget(Paragraph::new(Line::from(line)), area);
}

fn footer_commands(mode: AppMode) -> &'static [(&'static str, &'static str)] {
    match mode {
        AppMode::Scanning => &[("q", "Quit")],
        AppMode::Browsing => &[
            ("↑/k ↓/j", "Navigate files"),
            ("←/h →/l", "Switch groups"),
            ("Space", "Select"),
            ("d", "Delete selected"),
            ("q", "Quit"),
        ],
        AppMode::Confirming => &[("y", "Yes"), ("n/Esc", "No")],
        AppMode::Deleting | AppMode::Quitting => &[],
    }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let spans: Vec<Span> = footer_commands(app.mode())
        .iter()
        .flat_map(|(key, desc)| {
            [
                Span::styled(
                    format!("[{key}]"),
                    Style::default()
                        .fg(theme.secondary)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" {desc}  "), Style::default().fg(theme.normal)),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(block().border_style(Style::default().fg(theme.dim)));
    frame.render_widget(footer, area);
}

fn render_confirm_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let dialog_area = centered_rect(60, 50, area);
    frame.render_widget(Clear, dialog_area);

    let files = app.pending();
    let mut lines = vec![
        Line::from(Span::styled(
            "Confirm Deletion",
            Style::default().fg(theme.danger).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(
            "Delete {} file(s) ({})?",
            files.len(),
            format_size(app.pending_size())
        )),
        Line::from(Span::styled(
            if app.use_trash() {
                "Files will be moved to the system trash."
            } else {
                "This cannot be undone."
            },
            Style::default().fg(theme.dim),
        )),
    ];

    let doomed = app.groups_losing_all_copies();
    if doomed > 0 {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Warning: every copy in {doomed} group(s) is selected!"),
            Style::default().fg(theme.danger).add_modifier(Modifier::BOLD),
        )));
    }

    lines.push(Line::from(""));
    let width = dialog_area.width.saturating_sub(8) as usize;
    for path in files.iter().take(CONFIRM_PREVIEW_FILES) {
        lines.push(Line::from(format!(
            "  {}",
            truncate_path(&path.to_string_lossy(), width)
        )));
    }
    if files.len() > CONFIRM_PREVIEW_FILES {
        lines.push(Line::from(format!(
            "  ... and {} more",
            files.len() - CONFIRM_PREVIEW_FILES
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[y] Yes  [n] No",
        Style::default().fg(theme.primary),
    )));

    let dialog = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .block(titled_block("Confirm").border_style(Style::default().fg(theme.danger)));
    frame.render_widget(dialog, dialog_area);
}

fn render_deleting_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let dialog_area = centered_rect(40, 20, area);
    frame.render_widget(Clear, dialog_area);

    let dialog = Paragraph::new(format!("Deleting {} file(s)...", app.pending().len()))
        .alignment(Alignment::Center)
        .block(block().border_style(Style::default().fg(app.theme().secondary)));
    frame.render_widget(dialog, dialog_area);
}

fn render_error_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let dialog_area = centered_rect(70, 40, area);
    frame.render_widget(Clear, dialog_area);

    let mut lines = vec![
        Line::from(Span::styled(
            "Error",
            Style::default().fg(theme.danger).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(
        app.error_message()
            .unwrap_or("Unknown error")
            .lines()
            .map(|l| Line::from(l.to_string())),
    );
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press any key to dismiss",
        Style::default().fg(theme.dim),
    )));

    let dialog = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .block(block().border_style(Style::default().fg(theme.danger)));
    frame.render_widget(dialog, dialog_area);
}

// ==================== Helper Functions ====================

/// Format bytes as a human-readable size.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

/// Shorten `path` to at most `max_len` characters, keeping the file name.
///
/// # Examples
///
/// ```
/// use dupewalk::tui::ui::truncate_path;
///
/// assert_eq!(truncate_path("/a/b.txt", 50), "/a/b.txt");
/// let short = truncate_path("/very/long/path/to/some/nested/file.txt", 24);
/// assert!(short.ends_with("file.txt"));
/// assert!(short.contains("..."));
/// ```
#[must_use]
pub fn truncate_path(path: &str, max_len: usize) -> String {
    let len = path.chars().count();
    if len <= max_len {
        return path.to_string();
    }
    if max_len <= 3 {
        return ".".repeat(max_len);
    }

    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let name_len = name.chars().count();
    if name_len + 4 <= max_len {
        let head: String = path.chars().take(max_len - name_len - 4).collect();
        return format!("{head}.../{name}");
    }

    let tail: String = path.chars().skip(len - (max_len - 3)).collect();
    format!("...{tail}")
}

/// A rectangle centered in `area` with the given percentage size.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use dupewalk::actions::BatchDeleteResult;
use dupewalk::duplicates::{DuplicateGroup, ScanSummary};
use dupewalk::progress::ScanProgress;
use dupewalk::scanner::Fingerprint;
use dupewalk::tui::app::{Action, App, AppMode, Command, Event};
use dupewalk::tui::ui::render;
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use std::path::PathBuf;

fn setup_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
    let backend = TestBackend::new(width, height);
    Terminal::new(backend).unwrap()
}

fn make_group(size: u64, paths: &[&str]) -> DuplicateGroup {
    DuplicateGroup::new(
        size,
        Fingerprint::from("ab12"),
        paths.iter().map(PathBuf::from).collect(),
    )
}

fn draw(app: &App) -> String {
    let mut terminal = setup_terminal(100, 30);
    terminal.draw(|f| render(f, app)).unwrap();
    format!("{:?}", terminal.backend().buffer())
}

fn key(c: char) -> Event {
    Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

#[test]
fn test_render_scanning_progress() {
    let mut app = App::new();
    app.update(Event::Tick(ScanProgress {
        phase: "fingerprinting".to_string(),
        current_path: "/data/file.bin".to_string(),
        current: 3,
        total: 10,
        bytes: 2048,
    }));

    let content = draw(&app);
    assert!(content.contains("dupewalk"));
    assert!(content.contains("scanning..."));
    assert!(content.contains("Phase: fingerprinting"));
    assert!(content.contains("3/10"));
}

#[test]
fn test_render_no_duplicates() {
    let mut app = App::new();
    app.update(Event::ScanComplete(ScanSummary::default()));

    let content = draw(&app);
    assert!(content.contains("No duplicate files found."));
    assert!(content.contains("scan complete"));
}

#[test]
fn test_render_first_group_while_scanning() {
    let mut app = App::new();
    app.update(Event::Group(make_group(1024, &["/photos/a.jpg", "/backup/a.jpg"])));
    app.update(Event::Group(make_group(10, &["/x", "/y"])));

    assert_eq!(app.mode(), AppMode::Browsing);
    let content = draw(&app);
    assert!(content.contains("Group 1/2"));
    assert!(content.contains("/photos/a.jpg"));
    assert!(content.contains("/backup/a.jpg"));
    assert!(content.contains("scanning..."));
}

#[test]
fn test_render_selection_markers() {
    let mut app = App::new();
    app.update(Event::Group(make_group(100, &["/keep", "/drop"])));
    app.update(key('j'));
    app.update(key(' '));

    let content = draw(&app);
    assert!(content.contains("[x]"));
    assert!(content.contains("(marked for deletion)"));
}

#[test]
fn test_navigate_between_groups_with_keys() {
    let mut app = App::new();
    app.update(Event::Group(make_group(100, &["/a1", "/a2"])));
    app.update(Event::Group(make_group(200, &["/b1", "/b2"])));

    app.update(key('l'));
    assert!(draw(&app).contains("Group 2/2"));
    app.update(key('h'));
    assert!(draw(&app).contains("Group 1/2"));
}

#[test]
fn test_confirm_dialog_lists_pending_files() {
    let mut app = App::new();
    app.update(Event::Group(make_group(100, &["/keep", "/drop"])));
    app.update(Event::Action(Action::NavigateDown));
    app.update(Event::Action(Action::ToggleSelect));
    app.update(key('d'));

    assert_eq!(app.mode(), AppMode::Confirming);
    let content = draw(&app);
    assert!(content.contains("Confirm Deletion"));
    assert!(content.contains("Delete 1 file(s)"));
    assert!(content.contains("/drop"));
    assert!(content.contains("[y] Yes"));
    assert!(!content.contains("Warning"));
}

#[test]
fn test_confirm_dialog_warns_when_no_copy_survives() {
    let mut app = App::new().with_trash(true);
    app.update(Event::Group(make_group(100, &["/one", "/two"])));
    app.update(Event::Action(Action::ToggleSelect));
    app.update(Event::Action(Action::NavigateDown));
    app.update(Event::Action(Action::ToggleSelect));
    app.update(Event::Action(Action::Delete));

    let content = draw(&app);
    assert!(content.contains("Warning"));
    assert!(content.contains("system trash"));
}

#[test]
fn test_confirm_then_delete_flow() {
    let mut app = App::new();
    app.update(Event::Group(make_group(100, &["/keep", "/drop"])));
    app.update(Event::Action(Action::NavigateDown));
    app.update(Event::Action(Action::ToggleSelect));
    app.update(Event::Action(Action::Delete));

    let command = app.update(key('y'));
    assert_eq!(command, Some(Command::DeleteFiles(vec![PathBuf::from("/drop")])));
    assert_eq!(app.mode(), AppMode::Deleting);
    assert!(draw(&app).contains("Deleting 1 file(s)"));

    // Quit is ignored until the batch reports back.
    assert_eq!(app.update(key('q')), None);
    assert_eq!(app.mode(), AppMode::Deleting);

    let mut result = BatchDeleteResult::default();
    result.failures.push((PathBuf::from("/drop"), "Permission denied".to_string()));
    app.update(Event::Deleted(result));

    assert_eq!(app.mode(), AppMode::Browsing);
    let content = draw(&app);
    assert!(content.contains("Error"));
    assert!(content.contains("Permission denied"));

    // Any key dismisses the overlay.
    app.update(key('x'));
    assert!(!draw(&app).contains("Press any key to dismiss"));
}

#[test]
fn test_cancel_returns_to_browsing() {
    let mut app = App::new();
    app.update(Event::Group(make_group(100, &["/keep", "/drop"])));
    app.update(Event::Action(Action::ToggleSelect));
    app.update(Event::Action(Action::Delete));
    app.update(Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));

    assert_eq!(app.mode(), AppMode::Browsing);
    assert!(app.selected().is_empty());
    assert!(!draw(&app).contains("Confirm Deletion"));
}

#[test]
fn test_quit_from_scanning() {
    let mut app = App::new();
    assert_eq!(app.update(key('q')), Some(Command::Quit));
    assert!(app.should_quit());
}

#[test]
fn test_ctrl_c_quits_while_browsing() {
    let mut app = App::new();
    app.update(Event::Group(make_group(1, &["/a", "/b"])));
    let command = app.update(Event::Key(KeyEvent::new(
        KeyCode::Char('c'),
        KeyModifiers::CONTROL,
    )));
    assert_eq!(command, Some(Command::Quit));
}

#[test]
fn test_terminate_quits_from_any_mode() {
    let mut app = App::new();
    app.update(Event::Group(make_group(1, &["/a", "/b"])));
    app.update(Event::Action(Action::ToggleSelect));
    app.update(Event::Action(Action::Delete));
    assert_eq!(app.mode(), AppMode::Confirming);

    assert_eq!(app.update(Event::Terminate), Some(Command::Quit));
    assert_eq!(app.mode(), AppMode::Quitting);
}

#[test]
fn test_render_small_terminal() {
    let mut app = App::new();
    app.update(Event::Group(make_group(
        4096,
        &["/a/very/long/path/that/does/not/fit/anywhere/file.txt", "/b"],
    )));
    let mut terminal = setup_terminal(30, 12);
    terminal.draw(|f| render(f, &app)).unwrap();
}

#[test]
fn test_header_reports_skipped_buckets() {
    let mut app = App::new();
    app.update(Event::ScanComplete(ScanSummary {
        buckets_total: 3,
        buckets_failed: 2,
        candidate_sets_failed: 1,
        ..ScanSummary::default()
    }));

    let content = draw(&app);
    assert!(content.contains("skipped 2 bucket(s), 1 set(s)"));
}

#[test]
fn test_header_quiet_without_errors() {
    let mut app = App::new();
    app.update(Event::ScanComplete(ScanSummary::default()));
    assert!(!draw(&app).contains("skipped"));
}

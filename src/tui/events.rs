//! Key decoding and terminal input.
//!
//! | Key              | Mode                 | Action          |
//! |------------------|----------------------|-----------------|
//! | `k` / Up         | Browsing             | previous file   |
//! | `j` / Down       | Browsing             | next file       |
//! | `h` / Left       | Browsing             | previous group  |
//! | `l` / Right      | Browsing             | next group      |
//! | Space            | Browsing             | toggle select   |
//! | `d`              | Browsing             | delete selected |
//! | `y`              | Confirming           | confirm         |
//! | `n` / Esc        | Confirming           | abort           |
//! | `q` / Ctrl+C     | any                  | quit            |

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::{Action, AppMode, Event};

/// How long the input thread blocks before rechecking its stop flag.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Decode a key press for the given mode.
///
/// Quit is decoded everywhere; the state machine decides whether it applies.
#[must_use]
pub fn action_for(key: &KeyEvent, mode: AppMode) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    if let KeyCode::Char('q') = key.code {
        return Some(Action::Quit);
    }

    match mode {
        AppMode::Confirming => match key.code {
            KeyCode::Char('y' | 'Y') => Some(Action::Confirm),
            KeyCode::Char('n' | 'N') | KeyCode::Esc => Some(Action::Cancel),
            _ => None,
        },
        AppMode::Browsing => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::NavigateUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::NavigateDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Action::PreviousGroup),
            KeyCode::Right | KeyCode::Char('l') => Some(Action::NextGroup),
            KeyCode::Char(' ') => Some(Action::ToggleSelect),
            KeyCode::Char('d') => Some(Action::Delete),
            _ => None,
        },
        AppMode::Scanning | AppMode::Deleting | AppMode::Quitting => None,
    }
}

/// Forward terminal key presses and resizes to `tx` until `stop` is set.
///
/// A read failure sends [`Event::Terminate`], since the UI can no longer
/// be driven.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned.
pub fn spawn_input_thread(
    tx: Sender<Event>,
    stop: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("dupewalk-input".to_string())
        .spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                match read_event() {
                    Ok(Some(ev)) => {
                        if tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::error!("Terminal input failed: {}", e);
                        let _ = tx.send(Event::Terminate);
                        break;
                    }
                }
            }
        })
}

fn read_event() -> io::Result<Option<Event>> {
    if !event::poll(POLL_TIMEOUT)? {
        return Ok(None);
    }
    Ok(match event::read()? {
        event::Event::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        event::Event::Resize(cols, rows) => Some(Event::Resize(cols, rows)),
        _ => None,
    })
}

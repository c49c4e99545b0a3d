//! Interactive reconciler.
//!
//! The TUI consumes the duplicate-group stream while it is still being
//! produced and lets the user select and delete redundant copies.
//!
//! - [`app`]: the state machine ([`App::update`] is the only mutator)
//! - [`events`]: key decoding and the terminal input thread
//! - [`ui`]: pure rendering of an [`App`]
//! - [`run`]: terminal setup and the single-threaded control loop
//! - [`theme`]: color palettes
//!
//! Data flows one way: event sources send [`Event`]s down one channel, the
//! loop applies them to the [`App`], performs any returned [`Command`], and
//! redraws.

pub mod app;
pub mod events;
pub mod run;
pub mod theme;
pub mod ui;

pub use app::{Action, App, AppMode, Command, Event};
pub use events::action_for;
pub use run::{control_loop, run_tui, TuiError, TuiOptions, TuiOutcome, TuiResult};
pub use theme::{Theme, ThemeChoice};
pub use ui::{format_size, render, truncate_path};

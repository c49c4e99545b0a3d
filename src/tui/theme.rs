//! TUI color palettes.
//!
//! [`Theme`] holds the colors the renderer uses. [`ThemeChoice`] is the
//! user-facing setting (`auto`, `dark`, `light`) from the CLI or config.

use clap::ValueEnum;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Theme preference as configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    /// Guess from the terminal environment
    #[default]
    Auto,
    /// Light text on a dark background
    Dark,
    /// Dark text on a light background
    Light,
}

/// Colors used by TUI components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Headers, borders, cursor
    pub primary: Color,
    /// Selection markers
    pub secondary: Color,
    /// Delete prompts and errors
    pub danger: Color,
    /// Summaries and positive status
    pub success: Color,
    /// Secondary text
    pub dim: Color,
    /// Main text
    pub normal: Color,
    /// Text on a highlighted background
    pub inverted_fg: Color,
}

impl Theme {
    /// High-contrast dark theme (default).
    #[must_use]
    pub fn dark() -> Self {
        Self {
            primary: Color::Cyan,
            secondary: Color::Yellow,
            danger: Color::Red,
            success: Color::Green,
            dim: Color::DarkGray,
            normal: Color::White,
            inverted_fg: Color::Black,
        }
    }

    /// High-contrast light theme.
    #[must_use]
    pub fn light() -> Self {
        Self {
            primary: Color::Blue,
            secondary: Color::Magenta,
            danger: Color::Red,
            success: Color::Green,
            dim: Color::Gray,
            normal: Color::Black,
            inverted_fg: Color::White,
        }
    }

    /// Detect the terminal background, defaulting to dark.
    #[must_use]
    pub fn auto() -> Self {
        if is_light_terminal(std::env::var("COLORFGBG").ok().as_deref()) {
            Self::light()
        } else {
            Self::dark()
        }
    }

    /// Resolve a configured preference.
    #[must_use]
    pub fn from_choice(choice: ThemeChoice) -> Self {
        match choice {
            ThemeChoice::Auto => Self::auto(),
            ThemeChoice::Dark => Self::dark(),
            ThemeChoice::Light => Self::light(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Heuristic over `COLORFGBG` ("fg;bg"), set by rxvt, xterm and konsole.
fn is_light_terminal(colorfgbg: Option<&str>) -> bool {
    colorfgbg
        .and_then(|v| v.rsplit(';').next())
        .and_then(|bg| bg.parse::<u32>().ok())
        // 0 = black, 7 = gray, 8 = dark gray, 15 = white
        .is_some_and(|bg| bg >= 7 && bg != 8)
}

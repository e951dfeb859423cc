//! Styling for the human-readable reports.
//!
//! Colour is decided once per process, from stdout's capabilities. Everything
//! here degrades to plain text when stdout is redirected.

use std::sync::OnceLock;

use owo_colors::{OwoColorize, Style};

/// Reports narrower than this print one counter per line.
const NARROW_COLUMNS: u16 = 60;

fn colour_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| supports_color::on(supports_color::Stream::Stdout).is_some())
}

fn paint(text: &str, style: Style) -> String {
    if colour_enabled() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

/// Whether the terminal is too narrow for single-line summaries.
pub fn is_narrow() -> bool {
    terminal_size::terminal_size().is_some_and(|(width, _)| width.0 < NARROW_COLUMNS)
}

/// A report title followed by a dimmed underline of the same width.
pub fn heading(title: &str) -> String {
    let rule = "─".repeat(title.chars().count());
    format!("{title}\n{}", rule.dim())
}

/// Report styles for status lines and values.
pub trait Colorize {
    /// Green: the run left nothing to review.
    fn success(&self) -> String;
    /// Yellow: something needs a maintainer's attention.
    fn warning(&self) -> String;
    /// Blue: a counter or other reported value.
    fn info(&self) -> String;
    /// Secondary detail.
    fn dim(&self) -> String;
}

impl Colorize for str {
    fn success(&self) -> String {
        paint(self, Style::new().green())
    }

    fn warning(&self) -> String {
        paint(self, Style::new().yellow())
    }

    fn info(&self) -> String {
        paint(self, Style::new().blue())
    }

    fn dim(&self) -> String {
        paint(self, Style::new().dimmed())
    }
}

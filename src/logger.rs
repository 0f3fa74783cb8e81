//! Terminal logging for the overlay.
//!
//! Every line is `[module] message`, the prefix colored by module. Sources,
//! the registry and the CLI all go through the same two macros:
//!
//! ```ignore
//! log!("content"; "mounted {} sources", count);
//! debug!("archive"; "opening {}", path.display());   // --verbose only
//! ```
//!
//! Long-running commands can turn on [`set_timestamps`] so that lines carry
//! the wall-clock time of the change they report.

use std::io::{Write, stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crossterm::{
    execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;

static VERBOSE: AtomicBool = AtomicBool::new(false);
static TIMESTAMPS: AtomicBool = AtomicBool::new(false);

/// Enable `debug!` output (set by `--verbose`).
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Prefix every line with `HH:MM:SS` (UTC).
pub fn set_timestamps(enabled: bool) {
    TIMESTAMPS.store(enabled, Ordering::Relaxed);
}

/// Log a message with a colored module prefix.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like [`log!`], but only with `--verbose`. Arguments are not evaluated otherwise.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Run a block only with `--verbose`, for debug output that is costly to gather.
#[macro_export]
macro_rules! debug_do {
    ($($body:tt)*) => {{
        if $crate::logger::is_verbose() {
            $($body)*
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let line = if TIMESTAMPS.load(Ordering::Relaxed) {
        format!("{} {} {message}", timestamp().dimmed(), prefix(module))
    } else {
        format!("{} {message}", prefix(module))
    };

    let mut out = stdout().lock();
    // Overwrite whatever a previous partial line left behind
    execute!(out, Clear(ClearType::UntilNewLine)).ok();
    writeln!(out, "{line}").ok();
    out.flush().ok();
}

fn prefix(module: &str) -> String {
    let tag = format!("[{module}]");
    if module.eq_ignore_ascii_case("content") {
        tag.bright_blue().bold().to_string()
    } else if module.eq_ignore_ascii_case("watch") {
        tag.bright_green().bold().to_string()
    } else if ["conflict", "error"].iter().any(|m| module.eq_ignore_ascii_case(m)) {
        tag.bright_red().bold().to_string()
    } else if module.eq_ignore_ascii_case("warning") {
        tag.bright_magenta().bold().to_string()
    } else {
        tag.bright_yellow().bold().to_string()
    }
}

fn timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

//! Terminal output.
//!
//! - `log!("module"; ...)` prints a line behind a colored `[module]` tag
//! - `debug!` does the same, but only with `--verbose`
//! - the `status_*` functions drive the rebuild status block in serve mode
//!
//! ```ignore
//! log!("serve"; "http://{}", addr);
//! debug!("watch"; "raw event: {:?}", event);
//! status_success("pipeline in 120ms, reloaded 2 client(s)");
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{IsTerminal, Write, stdout},
    sync::atomic::{AtomicBool, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable `debug!` output for the whole process.
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Print `format!(...)` behind a colored `[module]` tag.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like `log!`, printed only in verbose mode. Arguments are not evaluated
/// otherwise.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let tag = tag(module);
    let mut out = stdout().lock();
    if out.is_terminal() {
        execute!(out, Clear(ClearType::UntilNewLine)).ok();
    }
    writeln!(out, "{tag} {message}").ok();
    out.flush().ok();
}

/// `[module]`, colored by subsystem.
fn tag(module: &str) -> String {
    let tag = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "serve" | "build" => tag.bright_blue().bold().to_string(),
        "watch" | "vfs" => tag.bright_green().bold().to_string(),
        "reload" => tag.bright_cyan().bold().to_string(),
        "rebuild" | "pipeline" => tag.bright_magenta().bold().to_string(),
        "error" => tag.bright_red().bold().to_string(),
        _ => tag.bright_yellow().bold().to_string(),
    }
}

/// Wall-clock time of day (UTC), `HH:MM:SS`.
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!(
        "{:02}:{:02}:{:02}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Warning,
    Failure,
}

impl Outcome {
    fn symbol(self) -> String {
        match self {
            Self::Success => "✓".green().to_string(),
            Self::Warning => "⚠".yellow().to_string(),
            Self::Failure => "✗".red().to_string(),
        }
    }
}

/// Rebuild status block.
///
/// Each rebuild replaces the previous block on a terminal, so a long serve
/// session shows only the latest outcome. Piped output is appended.
struct StatusBlock {
    /// Height of the block printed last, 0 when nothing may be erased.
    height: usize,
}

static STATUS: Mutex<StatusBlock> = Mutex::new(StatusBlock { height: 0 });

impl StatusBlock {
    fn show(&mut self, outcome: Outcome, message: &str) {
        let mut out = stdout().lock();
        let interactive = out.is_terminal();

        if interactive && self.height > 0 {
            let up = u16::try_from(self.height).unwrap_or(u16::MAX);
            execute!(out, cursor::MoveUp(up), Clear(ClearType::FromCursorDown)).ok();
        }

        let time = format!("[{}]", clock()).dimmed().to_string();
        writeln!(out, "{time} {} {message}", outcome.symbol()).ok();
        out.flush().ok();

        self.height = if interactive { height_of(message) } else { 0 };
    }
}

fn height_of(message: &str) -> usize {
    message.lines().count().max(1)
}

pub fn status_success(message: &str) {
    STATUS.lock().show(Outcome::Success, message);
}

/// Failure with an optional multi-line detail below the summary.
pub fn status_error(summary: &str, detail: &str) {
    let message = if detail.is_empty() {
        summary.to_string()
    } else {
        format!("{summary}\n{detail}")
    };
    STATUS.lock().show(Outcome::Failure, &message);
}

pub fn status_warning(message: &str) {
    STATUS.lock().show(Outcome::Warning, message);
}

/// Keep the current block on screen: regular log lines follow it.
pub fn status_detach() {
    STATUS.lock().height = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_of() {
        assert_eq!(height_of(""), 1);
        assert_eq!(height_of("pipeline in 80ms"), 1);
        assert_eq!(
            height_of("pipeline failed\n`npx` exited with status 1\nmissing input"),
            3
        );
    }

    #[test]
    fn test_clock_format() {
        let clock = clock();
        assert_eq!(clock.len(), 8);
        assert_eq!(clock.matches(':').count(), 2);
    }

    #[test]
    fn test_verbose_toggle() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }
}

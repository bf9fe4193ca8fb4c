//! Colored terminal output for recipe runs
//!
//! Progress lines are gated by a process-wide verbosity level:
//! - 0: warnings and errors only
//! - 1: recipe and processor names (default)
//! - 2: input/output snapshots of each step
//! - 3: the full environment before and after the run

use owo_colors::OwoColorize;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};

static VERBOSITY: AtomicU8 = AtomicU8::new(1);

pub fn set_verbosity(level: u8) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

pub fn verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

fn enabled(level: u8) -> bool {
    verbosity() >= level
}

/// Print an action header (blue, bold)
/// Example: "==> Processing Firefox.download.recipe"
pub fn action(message: &str) {
    if enabled(1) {
        println!("{} {}", "==>".blue().bold(), message.bold());
    }
}

/// Print a numbered action (cyan counter)
/// Example: "(1/5) Processing Firefox.download.recipe"
pub fn action_numbered(current: usize, total: usize, message: &str) {
    if enabled(1) {
        println!(
            "{} {}",
            format!("({}/{})", current, total).cyan(),
            message.bold()
        );
    }
}

/// Print a sub-action (cyan arrow)
/// Example: "  -> URLDownloader"
pub fn sub_action(step: &str) {
    if enabled(1) {
        println!("  {} {}", "->".cyan(), step);
    }
}

/// Print a detail line (dimmed)
pub fn detail(message: &str) {
    if enabled(2) {
        println!("     {}", message.dimmed());
    }
}

/// Pretty-print a labelled value as JSON when verbosity is at least `level`.
pub fn dump<T: Serialize>(level: u8, label: &str, value: &T) {
    if !enabled(level) {
        return;
    }
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("     {}", label.cyan());
            for line in text.lines() {
                println!("       {}", line.dimmed());
            }
        }
        Err(e) => warning(&format!("could not render {label}: {e}")),
    }
}

/// Print a success message (green)
pub fn success(message: &str) {
    if enabled(1) {
        println!("{} {}", "==>".green().bold(), message.green());
    }
}

/// Print an info message (cyan)
pub fn info(message: &str) {
    if enabled(1) {
        println!("{} {}", "::".cyan(), message);
    }
}

/// Print a skip message (dimmed)
/// Example: "==> Firefox stopped early"
pub fn skip(message: &str) {
    if enabled(1) {
        println!("{} {}", "==>".dimmed(), message.dimmed());
    }
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

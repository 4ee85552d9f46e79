use owo_colors::OwoColorize;

use crate::coordinator::{DirectoryListing, PathEntry};
use crate::notify::{NotificationSink, NotifyLevel};

/// Small wrapper around stdout/stderr printing to provide consistent, colored
/// user-facing messages. Colors are enabled only when output is a TTY.
fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Print a plain user-facing line (no prefix). Use this for primary outputs
/// such as listings which users may script against.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

fn entry_line(entry: &PathEntry) -> String {
    let size = entry.size.map(|s| s.to_string()).unwrap_or_default();
    let name = if entry.is_directory {
        format!("{}/", entry.name)
    } else {
        entry.name.clone()
    };
    format!("{:<10} {:>10}  {}", entry.last_modified_label, size, name)
}

/// Directories first, then files; directory names in blue on a TTY.
pub fn print_listing(listing: &DirectoryListing) {
    for entry in &listing.directories {
        let line = entry_line(entry);
        if is_tty() {
            print_user(&line.blue().to_string());
        } else {
            print_user(&line);
        }
    }
    for entry in &listing.files {
        print_user(&entry_line(entry));
    }
}

/// Routes notifications to the console helpers above.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Success => print_success(message),
            NotifyLevel::Info => print_info(message),
            NotifyLevel::Warning => print_warn(message),
            NotifyLevel::Error => print_error(message),
        }
    }
}

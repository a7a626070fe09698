//! Terminal front-end for a session
//!
//! Transcript entries go to stdout so they can be piped; status and control
//! state go to stderr.

use std::io::Write;

use chrono::Local;

use crate::session::{Role, SessionView, StatusIndicator, TranscriptEntry};

/// Renders a session to the terminal
#[derive(Debug, Default)]
pub struct TerminalView;

impl TerminalView {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Avatar shown in front of an entry
const fn avatar(role: Role) -> &'static str {
    match role {
        Role::User => "🎤",
        Role::Assistant => "🤖",
    }
}

/// One transcript line as printed
#[must_use]
pub fn format_entry(entry: &TranscriptEntry) -> String {
    let at = entry.at.with_timezone(&Local).format("%H:%M:%S");
    format!("{} [{at}] {}", avatar(entry.role), entry.content)
}

impl SessionView for TerminalView {
    fn status_changed(&self, indicator: StatusIndicator) {
        eprintln!("[{indicator}]");
    }

    fn entry_appended(&self, entry: &TranscriptEntry) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", format_entry(entry));
        let _ = stdout.flush();
    }

    fn capture_active(&self, active: bool) {
        if active {
            eprintln!("(mic on: speak now, /listen to stop)");
        } else {
            eprintln!("(mic off)");
        }
    }

    fn capture_disabled(&self) {
        eprintln!("(voice input disabled, type your requests)");
    }
}

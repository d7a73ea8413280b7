//! Terminal implementations of the notifier and navigator seams.
//!
//! Toasts go to stderr so stdout stays clean for `-o json` and friends.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use reelhouse_api::Navigator;
use reelhouse_core::{Notification, Notifier, Severity};

use crate::cli::{ColorMode, GlobalOpts};
use crate::output::should_color;

/// Prints each notification as one line on stderr.
///
/// Errors always print. Info and success lines are dropped under `--quiet`.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier {
    color: bool,
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(color: ColorMode, quiet: bool) -> Self {
        Self {
            color: should_color(color, &io::stderr()),
            quiet,
        }
    }

    pub fn from_global(global: &GlobalOpts) -> Self {
        Self::new(global.color, global.quiet)
    }

    fn line(&self, notification: &Notification) -> String {
        let marker = match notification.severity {
            Severity::Success => "✓",
            Severity::Error => "✗",
            Severity::Info => "•",
        };
        if !self.color {
            return format!("{marker} {}", notification.message);
        }
        match notification.severity {
            Severity::Success => format!("{} {}", marker.green(), notification.message),
            Severity::Error => format!("{} {}", marker.red(), notification.message.red()),
            Severity::Info => format!("{} {}", marker.cyan(), notification.message),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn publish(&self, notification: Notification) {
        if self.quiet && notification.severity != Severity::Error {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{}", self.line(&notification));
    }
}

/// There is no page to leave in a terminal: tell the user how to sign in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect(&self, route: &str) {
        tracing::debug!(route, "login redirect");
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "Session expired. Sign in again with `reelhouse login`."
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_carry_a_marker() {
        let notifier = ConsoleNotifier::new(ColorMode::Never, false);
        assert_eq!(
            notifier.line(&Notification::success("Playlist created")),
            "✓ Playlist created"
        );
        assert_eq!(
            notifier.line(&Notification::error("Playlist name taken")),
            "✗ Playlist name taken"
        );
    }

    #[test]
    fn colored_lines_keep_the_message() {
        let notifier = ConsoleNotifier::new(ColorMode::Always, false);
        let line = notifier.line(&Notification::info("A new film is available"));
        assert!(line.contains("A new film is available"));
        assert!(line.contains('\u{1b}'));
    }
}

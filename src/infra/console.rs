// ============================================================
// Layer 6 — Stdout Console
// ============================================================
// The Console the binary uses: every line goes to stdout as-is.
// Diagnostics go through tracing instead, so redirecting stdout
// captures only progress and accuracy lines.

use crate::domain::traits::Console;

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn line(&mut self, text: &str) {
        println!("{text}");
    }
}

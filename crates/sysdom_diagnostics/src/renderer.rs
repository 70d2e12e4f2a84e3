//! Human-readable issue rendering.

use crate::issue::Issue;

/// Formats an issue for display.
pub trait IssueRenderer {
    /// Renders a single issue.
    fn render(&self, issue: &Issue) -> String;
}

/// rustc-style terminal output:
///
/// ```text
/// warning[C001]: write collision on address 3
///   --> top.ram @ 40ns
///    = note: port b writes the same cell
/// ```
pub struct TerminalRenderer {
    /// Emit ANSI colors.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, issue: &Issue) -> String {
        let head = format!("{}[{}]", issue.severity, issue.code);
        if !self.color {
            return head;
        }
        let ansi = match issue.severity {
            crate::Severity::Error => "31",
            crate::Severity::Warning => "33",
            crate::Severity::Info => "36",
        };
        format!("\x1b[1;{ansi}m{head}\x1b[0m")
    }
}

impl IssueRenderer for TerminalRenderer {
    fn render(&self, issue: &Issue) -> String {
        let mut out = format!("{}: {}\n", self.paint(issue), issue.message);
        match (&issue.path, &issue.at) {
            (Some(path), Some(at)) => out.push_str(&format!("  --> {path} @ {at}\n")),
            (Some(path), None) => out.push_str(&format!("  --> {path}\n")),
            (None, Some(at)) => out.push_str(&format!("  --> @ {at}\n")),
            (None, None) => {}
        }
        for note in &issue.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        out
    }
}

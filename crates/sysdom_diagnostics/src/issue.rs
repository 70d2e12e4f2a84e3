//! Issues reported through the kernel issue channel.

use crate::code::IssueCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// One reported condition.
///
/// `path` is the dotted hierarchical name of the design object involved
/// (`top.ram.port_a`), `at` the simulated time if the issue was raised while
/// simulating.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Severity.
    pub severity: Severity,
    /// Code.
    pub code: IssueCode,
    /// Main message.
    pub message: String,
    /// Design object the issue concerns.
    pub path: Option<String>,
    /// Simulated time, pre-rendered.
    pub at: Option<String>,
    /// Additional context lines.
    pub notes: Vec<String>,
}

impl Issue {
    /// Creates an issue of the given severity.
    pub fn new(severity: Severity, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            path: None,
            at: None,
            notes: Vec::new(),
        }
    }

    /// Shorthand for an [`Severity::Info`] issue.
    pub fn info(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    /// Shorthand for a [`Severity::Warning`] issue.
    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Shorthand for an [`Severity::Error`] issue.
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Attaches the hierarchical path of the offending object.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attaches the simulated time.
    pub fn with_time(mut self, at: impl Into<String>) -> Self {
        self.at = Some(at.into());
        self
    }

    /// Appends a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain() {
        let issue = Issue::warning(IssueCode::PORT_COLLISION, "write collision")
            .with_path("top.ram")
            .with_time("20ns")
            .with_note("port b reads address 3");
        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(issue.path.as_deref(), Some("top.ram"));
        assert_eq!(issue.at.as_deref(), Some("20ns"));
        assert_eq!(issue.notes.len(), 1);
    }

    #[test]
    fn constructors_set_severity() {
        assert_eq!(Issue::info(IssueCode::USER, "m").severity, Severity::Info);
        assert_eq!(Issue::error(IssueCode::USER, "m").severity, Severity::Error);
    }

    #[test]
    fn serde_roundtrip() {
        let issue = Issue::error(IssueCode::UNBOUND_PORT, "port `d` is unbound").with_path("top.reg");
        let json = serde_json::to_string(&issue).unwrap();
        assert_eq!(serde_json::from_str::<Issue>(&json).unwrap(), issue);
    }
}

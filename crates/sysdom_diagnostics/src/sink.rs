//! Thread-safe issue accumulator.

use crate::issue::Issue;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Collects issues from the kernel, components and processes.
///
/// Error and warning counts are kept atomically so `has_errors` does not take
/// the lock.
pub struct IssueSink {
    issues: Mutex<Vec<Issue>>,
    errors: AtomicUsize,
    warnings: AtomicUsize,
}

impl IssueSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            issues: Mutex::new(Vec::new()),
            errors: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
        }
    }

    /// Records an issue.
    pub fn emit(&self, issue: Issue) {
        match issue.severity {
            Severity::Error => self.errors.fetch_add(1, Ordering::Relaxed),
            Severity::Warning => self.warnings.fetch_add(1, Ordering::Relaxed),
            Severity::Info => 0,
        };
        self.lock().push(issue);
    }

    /// True once any error-severity issue was recorded.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of error-severity issues.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// Number of warning-severity issues.
    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    /// Drains the sink. Counters are reset.
    pub fn take_all(&self) -> Vec<Issue> {
        let mut issues = self.lock();
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        std::mem::take(&mut *issues)
    }

    /// Snapshot of everything recorded so far.
    pub fn issues(&self) -> Vec<Issue> {
        self.lock().clone()
    }

    /// Snapshot of the issues at exactly `severity`.
    pub fn with_severity(&self, severity: Severity) -> Vec<Issue> {
        self.lock()
            .iter()
            .filter(|i| i.severity == severity)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Issue>> {
        self.issues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for IssueSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::IssueCode;
    use std::sync::Arc;

    #[test]
    fn empty_sink() {
        let sink = IssueSink::new();
        assert!(!sink.has_errors());
        assert!(sink.issues().is_empty());
    }

    #[test]
    fn counts_by_severity() {
        let sink = IssueSink::new();
        sink.emit(Issue::error(IssueCode::UNBOUND_PORT, "a"));
        sink.emit(Issue::warning(IssueCode::PORT_COLLISION, "b"));
        sink.emit(Issue::info(IssueCode::USER, "c"));
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 1);
        assert_eq!(sink.issues().len(), 3);
        assert_eq!(sink.with_severity(Severity::Info).len(), 1);
    }

    #[test]
    fn take_all_drains_and_resets() {
        let sink = IssueSink::new();
        sink.emit(Issue::error(IssueCode::USER, "x"));
        assert_eq!(sink.take_all().len(), 1);
        assert!(!sink.has_errors());
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn shared_across_threads() {
        let sink = Arc::new(IssueSink::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || sink.emit(Issue::warning(IssueCode::USER, format!("{i}"))))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.warning_count(), 4);
    }
}

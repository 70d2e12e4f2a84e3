//! The kernel issue channel.
//!
//! Structural problems (double ownership, unbound ports, width mismatches),
//! driver conflicts and modelled hardware races are not fatal errors. They are
//! reported as [`Issue`]s with a [`Severity`] into a shared [`IssueSink`].
//! Error-severity issues halt elaboration; warnings let simulation continue.

#![warn(missing_docs)]

pub mod code;
pub mod issue;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, IssueCode};
pub use issue::Issue;
pub use renderer::{IssueRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::IssueSink;

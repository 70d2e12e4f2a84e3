//! SysDOM structural representation.
//!
//! Components, signals, processes and events live in [`Arena`]s and refer to
//! each other by typed integer IDs, so parent/child/owner links never form
//! ownership cycles. The [`descriptor`] module holds the serializable records
//! that code generators walk after elaboration.

#![warn(missing_docs)]

pub mod arena;
pub mod descriptor;
pub mod ids;

pub use arena::{Arena, ArenaId};
pub use descriptor::{
    ComponentDescriptor, DeclSite, DesignDescriptor, IndexSpec, PortDescriptor, PortDirection,
    ProcessDescriptor, ProcessKind, SensitivityDescriptor, SignalDescriptor,
};
pub use ids::{ComponentId, EventId, PortId, ProcessId, SignalId};

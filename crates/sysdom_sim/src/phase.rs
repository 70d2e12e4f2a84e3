//! Kernel phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kernel's lifecycle state. Transitions only move forward, in
/// declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Objects are being created and wired.
    Construction,
    /// Static evaluation: reads return initial values, writes are dropped.
    DesignAnalysis,
    /// Lifecycle hooks register processes and validate ports.
    Elaboration,
    /// The scheduler runs.
    Simulation,
    /// Terminal.
    Stopped,
}

impl Phase {
    /// Signal reads are answered (with initial values during analysis).
    pub fn allows_read(self) -> bool {
        matches!(self, Phase::DesignAnalysis | Phase::Simulation)
    }

    /// Structural changes (new objects, ownership) are accepted.
    pub fn allows_structure(self) -> bool {
        self < Phase::Simulation
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Construction => "construction",
            Phase::DesignAnalysis => "design analysis",
            Phase::Elaboration => "elaboration",
            Phase::Simulation => "simulation",
            Phase::Stopped => "stopped",
        })
    }
}

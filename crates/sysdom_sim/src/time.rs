//! Kernel time: a physical instant plus the delta cycle within it.

use serde::{Deserialize, Serialize};
use std::fmt;
use sysdom_common::Time;

/// A point in simulated time. Orders by femtoseconds, then by delta index
/// (field order matters for the derived `Ord`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Physical time in femtoseconds.
    pub fs: u64,
    /// Delta cycles executed so far in this time step.
    pub delta: u32,
}

impl SimTime {
    /// Time zero before the first delta cycle.
    pub fn zero() -> Self {
        Self::default()
    }

    /// The physical part.
    pub fn time(&self) -> Time {
        Time::from_fs(self.fs)
    }

    pub(crate) fn next_delta(self) -> Self {
        Self {
            delta: self.delta.saturating_add(1),
            ..self
        }
    }

    /// Enters the time step at `fs`. Time never moves backward, so an
    /// earlier `fs` keeps the current step.
    pub(crate) fn advance_to(self, fs: u64) -> Self {
        if fs <= self.fs {
            return self;
        }
        Self { fs, delta: 0 }
    }
}

impl From<Time> for SimTime {
    fn from(time: Time) -> Self {
        Self {
            fs: time.as_fs(),
            delta: 0,
        }
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.delta {
            0 => write!(f, "{}", self.time()),
            d => write!(f, "{}+d{d}", self.time()),
        }
    }
}

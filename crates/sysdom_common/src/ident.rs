//! Interned names for design objects.
//!
//! Every component, signal and process carries a short local name ("clk",
//! "data", "ram0"). Names repeat heavily across instances, so the kernel
//! stores them as [`Ident`]s and resolves them back to text only when
//! building descriptors, issue paths or waveform scopes.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// A name interned in an [`Interner`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Rebuilds an `Ident` from its raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// The raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: the key is a plain `u32`; `try_from_usize` rejects indices that do
// not fit.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// Thread-safe name table backed by [`lasso::ThreadedRodeo`].
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Interner {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns `s`, returning the existing `Ident` if it was seen before.
    pub fn intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// The text of `ident`.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }

    /// Joins a sequence of names into a dotted hierarchical path.
    pub fn join_path(&self, segments: &[Ident]) -> String {
        segments
            .iter()
            .map(|s| self.resolve(*s))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

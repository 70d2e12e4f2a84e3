//! Lifecycle hook lists.

use std::fmt;

use sysdom_ir::ComponentId;

use crate::error::SimError;
use crate::kernel::Kernel;

/// Points in the kernel's life at which registered handlers run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Start of `elaborate`, still in construction.
    EndOfConstruction,
    /// Design analysis; reads see initial values.
    Analysis,
    /// Elaboration proper. Components initialize here.
    Elaborate,
    /// After every `Elaborate` handler. Components post-initialize here.
    EndOfElaboration,
    /// Once, when the kernel stops.
    SimulationStopped,
    /// After every delta cycle's commit.
    NextDeltaCycle,
}

impl Lifecycle {
    const COUNT: usize = 6;

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::EndOfConstruction => "end of construction",
            Lifecycle::Analysis => "analysis",
            Lifecycle::Elaborate => "elaborate",
            Lifecycle::EndOfElaboration => "end of elaboration",
            Lifecycle::SimulationStopped => "simulation stopped",
            Lifecycle::NextDeltaCycle => "next delta cycle",
        })
    }
}

/// Closure handler.
pub type Handler = Box<dyn FnMut(&mut Kernel) -> Result<(), SimError>>;

pub(crate) enum HookEntry {
    Closure(Handler),
    Component(ComponentId),
    /// Placeholder while the entry is being invoked.
    Running,
}

/// One handler list per [`Lifecycle`] point, in registration order.
pub(crate) struct Hooks {
    lists: [Vec<HookEntry>; Lifecycle::COUNT],
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            lists: std::array::from_fn(|_| Vec::new()),
        }
    }
}

impl Hooks {
    pub fn push(&mut self, stage: Lifecycle, entry: HookEntry) {
        self.lists[stage.slot()].push(entry);
    }

    pub fn len(&self, stage: Lifecycle) -> usize {
        self.lists[stage.slot()].len()
    }

    /// Takes entry `index` out for invocation, `None` past the end.
    pub fn take(&mut self, stage: Lifecycle, index: usize) -> Option<HookEntry> {
        self.lists[stage.slot()]
            .get_mut(index)
            .map(|e| std::mem::replace(e, HookEntry::Running))
    }

    pub fn restore(&mut self, stage: Lifecycle, index: usize, entry: HookEntry) {
        if let Some(slot) = self.lists[stage.slot()].get_mut(index) {
            *slot = entry;
        }
    }
}

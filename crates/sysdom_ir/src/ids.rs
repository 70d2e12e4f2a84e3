//! Typed IDs for design objects.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Wraps a raw index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// The raw index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// A component instance.
    ComponentId, "component"
);

define_id!(
    /// A signal (ordinary or resolved).
    SignalId, "signal"
);

define_id!(
    /// A registered process.
    ProcessId, "process"
);

define_id!(
    /// A plain, multi or predicated event.
    EventId, "event"
);

define_id!(
    /// A declared component port.
    PortId, "port"
);

//! Values that signals can carry.

use std::fmt::Debug;
use sysdom_common::{Logic, LogicVec};
use sysdom_ir::ProcessId;

/// A type that can be stored in a signal.
///
/// Bus values report their bit width so writes can be checked against the
/// signal's declared shape, and values with a bit-level meaning expose a
/// [`LogicVec`] for waveform recording.
pub trait SignalValue: Clone + PartialEq + Debug + 'static {
    /// Bit width when the value is a bus whose width is part of its shape.
    fn width(&self) -> Option<u32> {
        None
    }

    /// Bit-level rendering for waveform output.
    fn to_logic_vec(&self) -> Option<LogicVec> {
        None
    }

    /// Human-readable rendering used in descriptors.
    fn render(&self) -> String {
        format!("{self:?}")
    }
}

impl SignalValue for Logic {
    fn to_logic_vec(&self) -> Option<LogicVec> {
        Some(LogicVec::filled(1, *self))
    }

    fn render(&self) -> String {
        format!("'{self}'")
    }
}

impl SignalValue for LogicVec {
    fn width(&self) -> Option<u32> {
        Some(LogicVec::width(self))
    }

    fn to_logic_vec(&self) -> Option<LogicVec> {
        Some(self.clone())
    }

    fn render(&self) -> String {
        format!("\"{self}\"")
    }
}

impl SignalValue for bool {
    fn to_logic_vec(&self) -> Option<LogicVec> {
        Some(LogicVec::filled(1, Logic::from_bool(*self)))
    }
}

macro_rules! integer_value {
    ($($ty:ty),*) => {
        $(
            impl SignalValue for $ty {
                fn to_logic_vec(&self) -> Option<LogicVec> {
                    Some(LogicVec::from_u64(*self as u64, <$ty>::BITS))
                }
            }
        )*
    };
}

integer_value!(u8, u16, u32, u64, i32, i64);

/// A memory image: one word per address.
impl<T: SignalValue> SignalValue for Vec<T> {
    fn render(&self) -> String {
        format!("[{} words]", self.len())
    }
}

/// Who staged a value into a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Writer {
    /// A process body.
    Process(ProcessId),
    /// Code outside any process, e.g. a testbench driving inputs between runs.
    External,
}

impl std::fmt::Display for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Writer::Process(p) => write!(f, "{p}"),
            Writer::External => f.write_str("external driver"),
        }
    }
}

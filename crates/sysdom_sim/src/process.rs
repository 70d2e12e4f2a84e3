//! Processes: triggered bodies and resumable threads.
//!
//! A triggered process runs its body to completion on every wake-up. A
//! threaded process is a state machine the kernel resumes; it returns a
//! [`Step`] telling the kernel what to wait for before the next resumption.

use std::any::Any;
use std::marker::PhantomData;

use sysdom_common::{Ident, Time};
use sysdom_ir::{ComponentId, EventId, ProcessKind};

use crate::context::ProcessContext;
use crate::error::SimError;
use crate::event::Guard;

/// Body of a triggered process.
pub type TriggeredBody = Box<dyn FnMut(&mut ProcessContext<'_>) -> Result<(), SimError>>;

/// A resumable process body.
///
/// Each call runs from the last suspension point to the next one. State that
/// must survive a suspension lives in the implementing type or in
/// process-local slots.
pub trait Thread {
    /// Runs until the next suspension point.
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Step, SimError>;
}

impl<F> Thread for F
where
    F: FnMut(&mut ProcessContext<'_>) -> Result<Step, SimError>,
{
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Step, SimError> {
        self(ctx)
    }
}

/// Outcome of one [`Thread::resume`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Suspend until the wait completes.
    Wait(Wait),
    /// The body finished; restart at the top on the next sensitivity wake.
    EndOfBody,
}

/// What a suspended thread waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wait {
    /// One activation of the process's own (predicated) sensitivity.
    Tick,
    /// `n` activations of the process's sensitivity. `Ticks(0)` behaves like `Tick`.
    Ticks(u32),
    /// One firing of an event.
    Event(EventId),
    /// `n` firings of an event, e.g. `n` rising clock edges.
    Repeat(EventId, u32),
    /// The first firing of any of the events.
    AnyOf(Vec<EventId>),
    /// A span of simulated time.
    For(Time),
    /// Never resume.
    Forever,
}

pub(crate) enum Body {
    Triggered(TriggeredBody),
    Threaded(Box<dyn Thread>),
}

/// What a dormant process is armed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Arm {
    Sensitivity,
    Events(Vec<EventId>),
}

/// A multi-activation wait in progress.
#[derive(Clone, Debug)]
pub(crate) struct Countdown {
    pub arm: Arm,
    pub remaining: u32,
}

pub(crate) struct ProcessNode {
    pub name: Ident,
    pub owner: Option<ComponentId>,
    pub kind: ProcessKind,
    pub sensitivity: Vec<EventId>,
    /// The sensitivity the process was registered with, for descriptors.
    pub declared: Vec<EventId>,
    pub predicate: Option<Guard>,
    pub body: Option<Body>,
    pub locals: Vec<Box<dyn Any>>,
    pub token: u64,
    pub countdown: Option<Countdown>,
    pub wakes: u64,
}

/// Handle to a process-local storage slot.
///
/// A slot is declared once on the kernel; every process gets its own copy,
/// initialized from the declared value when simulation starts.
pub struct LocalSlot<T> {
    pub(crate) index: usize,
    _ty: PhantomData<fn() -> T>,
}

impl<T> LocalSlot<T> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            _ty: PhantomData,
        }
    }
}

impl<T> Clone for LocalSlot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LocalSlot<T> {}

impl<T> std::fmt::Debug for LocalSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalSlot({})", self.index)
    }
}

/// Initializer of one local slot.
pub(crate) type LocalInit = Box<dyn Fn() -> Box<dyn Any>>;

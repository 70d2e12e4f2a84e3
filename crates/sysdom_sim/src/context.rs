//! The handle a running process body works through.

use std::any::Any;

use sysdom_common::{Logic, Time};
use sysdom_diagnostics::{Issue, IssueCode};
use sysdom_ir::{EventId, ProcessId};

use crate::error::SimError;
use crate::kernel::Kernel;
use crate::process::LocalSlot;
use crate::signal::{SignalRef, SignalStore};
use crate::time::SimTime;
use crate::value::{SignalValue, Writer};

/// Sensitivity change requested by a triggered process body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NextTrigger {
    After(Time),
    On(Vec<EventId>),
}

/// Passed to every process activation.
///
/// Reads see committed values; writes are staged under this process's name
/// and become visible after the delta cycle's commit. Process-local storage
/// is reached through [`local`](Self::local).
pub struct ProcessContext<'k> {
    kernel: &'k mut Kernel,
    process: ProcessId,
    locals: &'k mut [Box<dyn Any>],
    next_trigger: Option<NextTrigger>,
}

impl<'k> ProcessContext<'k> {
    pub(crate) fn new(kernel: &'k mut Kernel, process: ProcessId, locals: &'k mut [Box<dyn Any>]) -> Self {
        Self {
            kernel,
            process,
            locals,
            next_trigger: None,
        }
    }

    pub(crate) fn into_next_trigger(self) -> Option<NextTrigger> {
        self.next_trigger
    }

    /// The running process.
    pub fn process(&self) -> ProcessId {
        self.process
    }

    /// Hierarchical name of the running process.
    pub fn path(&self) -> String {
        self.kernel.process_path(self.process)
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.kernel.now()
    }

    /// Read-only kernel access.
    pub fn kernel(&self) -> &Kernel {
        &*self.kernel
    }

    /// Committed signal values, e.g. for evaluating derived signals.
    pub fn signals(&self) -> &SignalStore {
        self.kernel.signals()
    }

    /// Committed value.
    pub fn cur<T: SignalValue>(&self, signal: &SignalRef<T>) -> Result<T, SimError> {
        self.kernel.cur(signal)
    }

    /// Value before the last commit.
    pub fn pre<T: SignalValue>(&self, signal: &SignalRef<T>) -> Result<T, SimError> {
        self.kernel.pre(signal)
    }

    /// Initial value.
    pub fn initial<T: SignalValue>(&self, signal: &SignalRef<T>) -> Result<T, SimError> {
        self.kernel.initial(signal)
    }

    /// Stages a write.
    pub fn write<T: SignalValue>(&mut self, signal: &SignalRef<T>, value: T) -> Result<(), SimError> {
        self.kernel
            .write_as(signal, value, Writer::Process(self.process))
    }

    /// True when the last commit moved `clk` to `1`.
    pub fn is_rising(&self, clk: &SignalRef<Logic>) -> Result<bool, SimError> {
        Ok(self.cur(clk)? == Logic::One && self.pre(clk)? != Logic::One)
    }

    /// True when the last commit moved `clk` to `0`.
    pub fn is_falling(&self, clk: &SignalRef<Logic>) -> Result<bool, SimError> {
        Ok(self.cur(clk)? == Logic::Zero && self.pre(clk)? != Logic::Zero)
    }

    /// This process's copy of a local slot.
    pub fn local<T: 'static>(&mut self, slot: LocalSlot<T>) -> Result<&mut T, SimError> {
        self.locals
            .get_mut(slot.index)
            .and_then(|b| b.downcast_mut::<T>())
            .ok_or(SimError::UnknownObject {
                kind: "local slot",
                index: slot.index as u32,
            })
    }

    /// Fires a plain event.
    pub fn fire(&mut self, event: EventId) -> Result<(), SimError> {
        self.kernel.fire(event)
    }

    /// Fires a plain event after `delay`.
    pub fn notify_after(&mut self, event: EventId, delay: Time) -> Result<(), SimError> {
        self.kernel.notify_after(event, delay)
    }

    /// Replaces the static sensitivity with a single timed wake-up after
    /// `delay`.
    pub fn next_trigger_after(&mut self, delay: Time) {
        self.next_trigger = Some(NextTrigger::After(delay));
    }

    /// Replaces the static sensitivity list.
    pub fn next_trigger_on(&mut self, events: impl IntoIterator<Item = EventId>) {
        self.next_trigger = Some(NextTrigger::On(events.into_iter().collect()));
    }

    /// Reports an issue attributed to this process.
    pub fn report(&self, mut issue: Issue) {
        if issue.path.is_none() {
            issue.path = Some(self.path());
        }
        self.kernel.report(issue);
    }

    /// Reports an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.report(Issue::info(IssueCode::USER, message));
    }

    /// Reports a warning.
    pub fn warning(&self, message: impl Into<String>) {
        self.report(Issue::warning(IssueCode::USER, message));
    }

    /// Reports an error. Simulation continues.
    pub fn error(&self, message: impl Into<String>) {
        self.report(Issue::error(IssueCode::USER, message));
    }

    /// Asks the kernel to stop after the current delta cycle.
    pub fn stop(&mut self) {
        self.kernel.request_stop();
    }

    /// Builds the error that fails the simulation. Return it from the body.
    pub fn fail(&self, reason: impl Into<String>) -> SimError {
        SimError::Failed {
            process: self.path(),
            reason: reason.into(),
        }
    }
}

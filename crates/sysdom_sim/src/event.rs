//! Events and the waiter lists behind sensitivity.
//!
//! A plain event is fired explicitly or by a signal value change. Composite
//! events never fire themselves: subscribing to a multi-event subscribes to
//! each constituent, and subscribing to a predicated event subscribes to its
//! base with the guard attached to the waiter.
//!
//! Waiters carry the process's wake token from the moment they were armed.
//! The first wake that gets through bumps the token, which turns every other
//! waiter of the same wait into a stale entry. That gives multi-events their
//! one-time invoker behavior without unsubscribing anything. Stale entries
//! of a process are swept the next time it arms on the same event, so a
//! waiter list never holds more than one wait's worth per process.

use std::rc::Rc;

use sysdom_ir::{Arena, EventId, ProcessId, SensitivityDescriptor, SignalId};

use crate::error::SimError;
use crate::signal::SignalStore;

/// A condition evaluated against committed signal values.
pub type Guard = Rc<dyn Fn(&SignalStore) -> Result<bool, SimError>>;

/// The signal condition an event stands for, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EventSource {
    Changed(SignalId),
    Rising(SignalId),
    Falling(SignalId),
}

pub(crate) enum EventKind {
    Plain,
    Multi(Vec<EventId>),
    Predicated { base: EventId, guard: Guard },
}

#[derive(Clone)]
pub(crate) struct Waiter {
    pub process: ProcessId,
    pub token: u64,
    pub guards: Vec<Guard>,
}

pub(crate) struct EventNode {
    kind: EventKind,
    source: Option<EventSource>,
    waiters: Vec<Waiter>,
}

/// Arena of events.
#[derive(Default)]
pub(crate) struct EventTable {
    nodes: Arena<EventId, EventNode>,
}

impl EventTable {
    pub fn plain(&mut self, source: Option<EventSource>) -> EventId {
        self.nodes.alloc(EventNode {
            kind: EventKind::Plain,
            source,
            waiters: Vec::new(),
        })
    }

    pub fn multi(&mut self, events: Vec<EventId>) -> Result<EventId, SimError> {
        for e in &events {
            self.check(*e)?;
        }
        Ok(self.nodes.alloc(EventNode {
            kind: EventKind::Multi(events),
            source: None,
            waiters: Vec::new(),
        }))
    }

    pub fn predicated(
        &mut self,
        base: EventId,
        guard: Guard,
        source: Option<EventSource>,
    ) -> Result<EventId, SimError> {
        self.check(base)?;
        Ok(self.nodes.alloc(EventNode {
            kind: EventKind::Predicated { base, guard },
            source,
            waiters: Vec::new(),
        }))
    }

    pub fn check(&self, event: EventId) -> Result<(), SimError> {
        self.nodes
            .try_get(event)
            .map(|_| ())
            .ok_or(SimError::UnknownObject {
                kind: "event",
                index: event.as_raw(),
            })
    }

    pub fn is_plain(&self, event: EventId) -> Result<bool, SimError> {
        self.check(event)?;
        Ok(matches!(self.nodes[event].kind, EventKind::Plain))
    }

    /// Arms `process` on `event`. Composite events expand into their plain
    /// constituents; predicated layers add their guard on top of `guards`.
    pub fn subscribe(
        &mut self,
        event: EventId,
        process: ProcessId,
        token: u64,
        guards: Vec<Guard>,
    ) -> Result<(), SimError> {
        self.check(event)?;
        let mut work = vec![(event, guards)];
        while let Some((id, mut guards)) = work.pop() {
            match &self.nodes[id].kind {
                EventKind::Plain => {
                    let waiters = &mut self.nodes[id].waiters;
                    waiters.retain(|w| w.process != process || w.token >= token);
                    waiters.push(Waiter {
                        process,
                        token,
                        guards,
                    });
                }
                EventKind::Multi(parts) => {
                    work.extend(parts.iter().map(|p| (*p, guards.clone())));
                }
                EventKind::Predicated { base, guard } => {
                    guards.push(guard.clone());
                    work.push((*base, guards));
                }
            }
        }
        Ok(())
    }

    /// Re-arms a waiter whose guard rejected a firing.
    pub fn rearm(&mut self, event: EventId, waiter: Waiter) {
        self.nodes[event].waiters.push(waiter);
    }

    pub fn take_waiters(&mut self, event: EventId) -> Vec<Waiter> {
        std::mem::take(&mut self.nodes[event].waiters)
    }

    pub fn describe(&self, event: EventId) -> SensitivityDescriptor {
        match self.nodes.try_get(event).and_then(|n| n.source) {
            Some(EventSource::Changed(s)) => SensitivityDescriptor::Signal(s),
            Some(EventSource::Rising(s)) => SensitivityDescriptor::RisingEdge(s),
            Some(EventSource::Falling(s)) => SensitivityDescriptor::FallingEdge(s),
            None => SensitivityDescriptor::Event(event),
        }
    }

    #[cfg(test)]
    pub fn waiter_count(&self, event: EventId) -> usize {
        self.nodes[event].waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(i: u32) -> ProcessId {
        ProcessId::from_raw(i)
    }

    #[test]
    fn multi_expands_to_constituents() {
        let mut t = EventTable::default();
        let a = t.plain(None);
        let b = t.plain(None);
        let m = t.multi(vec![a, b]).unwrap();
        t.subscribe(m, pid(0), 3, Vec::new()).unwrap();
        assert_eq!(t.take_waiters(a).len(), 1);
        let from_b = t.take_waiters(b);
        assert_eq!(from_b[0].process, pid(0));
        assert_eq!(from_b[0].token, 3);
        assert!(t.take_waiters(m).is_empty());
    }

    #[test]
    fn predicated_layers_stack_guards() {
        let mut t = EventTable::default();
        let base = t.plain(None);
        let g: Guard = Rc::new(|_| Ok(true));
        let inner = t.predicated(base, g.clone(), None).unwrap();
        let outer = t.predicated(inner, g, None).unwrap();
        t.subscribe(outer, pid(1), 0, Vec::new()).unwrap();
        let waiters = t.take_waiters(base);
        assert_eq!(waiters.len(), 1);
        assert_eq!(waiters[0].guards.len(), 2);
    }

    #[test]
    fn rearming_sweeps_stale_waiters() {
        let mut t = EventTable::default();
        let clk = t.plain(None);
        let rst = t.plain(None);
        let either = t.multi(vec![clk, rst]).unwrap();
        for token in 0..50 {
            t.subscribe(either, pid(0), token, Vec::new()).unwrap();
            t.take_waiters(clk);
        }
        t.subscribe(rst, pid(1), 0, Vec::new()).unwrap();
        assert_eq!(t.waiter_count(rst), 2);
        let left = t.take_waiters(rst);
        assert_eq!(left[0].token, 49);
        assert_eq!(left[1].process, pid(1));
    }

    #[test]
    fn only_plain_events_are_fireable() {
        let mut t = EventTable::default();
        let a = t.plain(None);
        let m = t.multi(vec![a]).unwrap();
        assert!(t.is_plain(a).unwrap());
        assert!(!t.is_plain(m).unwrap());
        assert!(t.is_plain(EventId::from_raw(40)).is_err());
    }

    #[test]
    fn unknown_constituent_rejected() {
        let mut t = EventTable::default();
        assert!(t.multi(vec![EventId::from_raw(2)]).is_err());
        assert!(t
            .predicated(EventId::from_raw(0), Rc::new(|_| Ok(true)), None)
            .is_err());
        assert!(t.check(EventId::from_raw(0)).is_err());
    }

    #[test]
    fn descriptors_follow_source() {
        let mut t = EventTable::default();
        let s = SignalId::from_raw(4);
        let changed = t.plain(Some(EventSource::Changed(s)));
        let rising = t
            .predicated(changed, Rc::new(|_| Ok(true)), Some(EventSource::Rising(s)))
            .unwrap();
        let bare = t.plain(None);
        assert_eq!(t.describe(changed), SensitivityDescriptor::Signal(s));
        assert_eq!(t.describe(rising), SensitivityDescriptor::RisingEdge(s));
        assert_eq!(t.describe(bare), SensitivityDescriptor::Event(bare));
    }
}

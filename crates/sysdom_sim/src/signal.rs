//! Signal storage and the two-phase update protocol.
//!
//! Every signal holds an initial, previous and current value plus whatever
//! writers staged during the running delta cycle. Writes never become visible
//! to readers in the same delta; [`SignalStore::commit`] publishes them all at
//! once after every ready process has run.
//!
//! Ordinary signals keep one staged value and remember every distinct
//! writer, so the kernel can flag multiple drivers. Resolved signals keep one
//! staged value per writer and fold them with [`Resolve`] at commit time.

use std::any::Any;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use sysdom_common::{resolve_all, Ident, LogicVec, Resolve};
use sysdom_ir::{Arena, ComponentId, DeclSite, EventId, IndexSpec, SignalDescriptor, SignalId};

use crate::error::SimError;
use crate::phase::Phase;
use crate::value::{SignalValue, Writer};

/// Typed handle to a signal.
///
/// The handle is `Copy` and carries no borrow: all access goes through the
/// kernel or a [`SignalStore`], which check phase rules.
pub struct SignalRef<T> {
    id: SignalId,
    _ty: PhantomData<fn() -> T>,
}

impl<T> SignalRef<T> {
    pub(crate) fn new(id: SignalId) -> Self {
        Self {
            id,
            _ty: PhantomData,
        }
    }

    /// The untyped ID.
    pub fn id(&self) -> SignalId {
        self.id
    }
}

impl<T> Clone for SignalRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SignalRef<T> {}

impl<T> PartialEq for SignalRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for SignalRef<T> {}

impl<T> Hash for SignalRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for SignalRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignalRef({})", self.id)
    }
}

enum Drive<T> {
    Ordinary {
        next: Option<T>,
        writers: Vec<Writer>,
    },
    Resolved {
        drivers: BTreeMap<Writer, T>,
        fold: fn(&[T]) -> Option<T>,
    },
}

/// Value cell of one signal.
pub(crate) struct SignalCell<T> {
    initial: T,
    previous: T,
    current: T,
    drive: Drive<T>,
}

/// What a commit did to one signal.
#[derive(Debug)]
pub(crate) struct Commit {
    pub changed: bool,
    /// Distinct writers of an ordinary signal, in write order.
    pub writers: Vec<Writer>,
}

impl<T: SignalValue> SignalCell<T> {
    fn ordinary(initial: T) -> Self {
        Self {
            previous: initial.clone(),
            current: initial.clone(),
            initial,
            drive: Drive::Ordinary {
                next: None,
                writers: Vec::new(),
            },
        }
    }

    fn resolved(initial: T) -> Self
    where
        T: Resolve,
    {
        Self {
            previous: initial.clone(),
            current: initial.clone(),
            initial,
            drive: Drive::Resolved {
                drivers: BTreeMap::new(),
                fold: fold_drivers::<T>,
            },
        }
    }

    fn stage(&mut self, value: T, writer: Writer) {
        match &mut self.drive {
            Drive::Ordinary { next, writers } => {
                *next = Some(value);
                if !writers.contains(&writer) {
                    writers.push(writer);
                }
            }
            Drive::Resolved { drivers, .. } => {
                drivers.insert(writer, value);
            }
        }
    }

    fn reset(&mut self, value: T) {
        self.previous = value.clone();
        self.current = value.clone();
        self.initial = value;
        match &mut self.drive {
            Drive::Ordinary { next, writers } => {
                *next = None;
                writers.clear();
            }
            Drive::Resolved { drivers, .. } => drivers.clear(),
        }
    }

    fn take_next(&mut self) -> (Option<T>, Vec<Writer>) {
        match &mut self.drive {
            Drive::Ordinary { next, writers } => (next.take(), std::mem::take(writers)),
            Drive::Resolved { drivers, fold } => {
                let values: Vec<T> = std::mem::take(drivers).into_values().collect();
                (fold(&values), Vec::new())
            }
        }
    }
}

fn fold_drivers<T: Resolve + Clone>(values: &[T]) -> Option<T> {
    resolve_all(values)
}

/// Type-erased view of a [`SignalCell`].
pub(crate) trait AnySignal {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn commit(&mut self) -> Commit;
    fn type_name(&self) -> &'static str;
    fn width(&self) -> Option<u32>;
    fn render_initial(&self) -> String;
    fn is_resolved(&self) -> bool;
    fn current_bits(&self) -> Option<LogicVec>;
}

impl<T: SignalValue> AnySignal for SignalCell<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn commit(&mut self) -> Commit {
        let (next, writers) = self.take_next();
        let Some(next) = next else {
            return Commit {
                changed: false,
                writers,
            };
        };
        let changed = next != self.current;
        self.previous = std::mem::replace(&mut self.current, next);
        Commit { changed, writers }
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn width(&self) -> Option<u32> {
        self.initial.width()
    }

    fn render_initial(&self) -> String {
        self.initial.render()
    }

    fn is_resolved(&self) -> bool {
        matches!(self.drive, Drive::Resolved { .. })
    }

    fn current_bits(&self) -> Option<LogicVec> {
        self.current.to_logic_vec()
    }
}

/// Arena entry for one signal.
pub(crate) struct SignalNode {
    pub name: Ident,
    pub owner: Option<ComponentId>,
    pub decl: Option<DeclSite>,
    pub index: IndexSpec,
    pub changed: EventId,
    pub cell: Box<dyn AnySignal>,
    pub staged: bool,
    pub descriptor: OnceCell<SignalDescriptor>,
}

/// All signals of a kernel, plus the phase that governs access to them.
///
/// Process bodies and event guards get a shared reference to the store and
/// read committed values through it.
pub struct SignalStore {
    pub(crate) nodes: Arena<SignalId, SignalNode>,
    dirty: Vec<SignalId>,
    phase: Phase,
}

impl SignalStore {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Arena::new(),
            dirty: Vec::new(),
            phase: Phase::Construction,
        }
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// The phase reads and writes are checked against.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of signals.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no signal exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn insert<T: SignalValue>(
        &mut self,
        name: Ident,
        changed: EventId,
        initial: T,
    ) -> SignalRef<T> {
        self.alloc(name, changed, Box::new(SignalCell::ordinary(initial)))
    }

    pub(crate) fn insert_resolved<T: SignalValue + Resolve>(
        &mut self,
        name: Ident,
        changed: EventId,
        initial: T,
    ) -> SignalRef<T> {
        self.alloc(name, changed, Box::new(SignalCell::resolved(initial)))
    }

    fn alloc<T>(&mut self, name: Ident, changed: EventId, cell: Box<dyn AnySignal>) -> SignalRef<T> {
        SignalRef::new(self.nodes.alloc(SignalNode {
            name,
            owner: None,
            decl: None,
            index: IndexSpec::default(),
            changed,
            cell,
            staged: false,
            descriptor: OnceCell::new(),
        }))
    }

    pub(crate) fn node(&self, id: SignalId) -> Result<&SignalNode, SimError> {
        self.nodes.try_get(id).ok_or(SimError::UnknownObject {
            kind: "signal",
            index: id.as_raw(),
        })
    }

    pub(crate) fn node_mut(&mut self, id: SignalId) -> Result<&mut SignalNode, SimError> {
        self.nodes.try_get_mut(id).ok_or(SimError::UnknownObject {
            kind: "signal",
            index: id.as_raw(),
        })
    }

    fn cell<T: SignalValue>(&self, signal: &SignalRef<T>) -> Result<&SignalCell<T>, SimError> {
        self.node(signal.id)?
            .cell
            .as_any()
            .downcast_ref::<SignalCell<T>>()
            .ok_or(SimError::TypeMismatch {
                signal: signal.id,
                expected: std::any::type_name::<T>(),
            })
    }

    fn cell_mut<T: SignalValue>(
        &mut self,
        signal: &SignalRef<T>,
    ) -> Result<&mut SignalCell<T>, SimError> {
        self.node_mut(signal.id)?
            .cell
            .as_any_mut()
            .downcast_mut::<SignalCell<T>>()
            .ok_or(SimError::TypeMismatch {
                signal: signal.id,
                expected: std::any::type_name::<T>(),
            })
    }

    /// The committed value. During design analysis this is the initial value.
    pub fn cur<T: SignalValue>(&self, signal: &SignalRef<T>) -> Result<T, SimError> {
        let cell = self.cell(signal)?;
        match self.phase {
            Phase::Simulation => Ok(cell.current.clone()),
            Phase::DesignAnalysis => Ok(cell.initial.clone()),
            phase => Err(SimError::PhaseViolation {
                operation: "read current value",
                phase,
            }),
        }
    }

    /// The value before the most recent commit. During design analysis this
    /// is the initial value.
    pub fn pre<T: SignalValue>(&self, signal: &SignalRef<T>) -> Result<T, SimError> {
        let cell = self.cell(signal)?;
        match self.phase {
            Phase::Simulation => Ok(cell.previous.clone()),
            Phase::DesignAnalysis => Ok(cell.initial.clone()),
            phase => Err(SimError::PhaseViolation {
                operation: "read previous value",
                phase,
            }),
        }
    }

    /// The initial value, readable in every phase.
    pub fn initial<T: SignalValue>(&self, signal: &SignalRef<T>) -> Result<T, SimError> {
        Ok(self.cell(signal)?.initial.clone())
    }

    /// Replaces the initial (and current and previous) value.
    pub(crate) fn set_initial<T: SignalValue>(
        &mut self,
        signal: &SignalRef<T>,
        value: T,
    ) -> Result<(), SimError> {
        match self.phase {
            Phase::Construction | Phase::DesignAnalysis => {}
            phase => {
                return Err(SimError::PhaseViolation {
                    operation: "set initial value",
                    phase,
                })
            }
        }
        let cell = self.cell_mut(signal)?;
        check_width(signal.id, &cell.initial, &value)?;
        cell.reset(value);
        Ok(())
    }

    /// Stages `value` for the next commit. Writes during design analysis
    /// are accepted and dropped.
    pub(crate) fn write<T: SignalValue>(
        &mut self,
        signal: &SignalRef<T>,
        value: T,
        writer: Writer,
    ) -> Result<(), SimError> {
        match self.phase {
            Phase::Simulation => {}
            Phase::DesignAnalysis => {
                self.cell(signal)?;
                return Ok(());
            }
            phase => {
                return Err(SimError::PhaseViolation {
                    operation: "write signal",
                    phase,
                })
            }
        }
        let cell = self.cell_mut(signal)?;
        check_width(signal.id, &cell.initial, &value)?;
        cell.stage(value, writer);
        let node = self.nodes.get_mut(signal.id);
        if !node.staged {
            node.staged = true;
            self.dirty.push(signal.id);
        }
        Ok(())
    }

    /// True while some signal has staged values.
    pub(crate) fn has_staged(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Publishes every staged value. Untouched signals are not visited.
    pub(crate) fn commit(&mut self) -> Vec<(SignalId, Commit)> {
        let mut dirty = std::mem::take(&mut self.dirty);
        dirty.sort_unstable();
        dirty
            .into_iter()
            .map(|id| {
                let node = self.nodes.get_mut(id);
                node.staged = false;
                (id, node.cell.commit())
            })
            .collect()
    }

    /// Bit-level rendering of the committed value, for waveforms.
    pub(crate) fn current_bits(&self, id: SignalId) -> Option<LogicVec> {
        self.nodes.try_get(id).and_then(|n| n.cell.current_bits())
    }
}

fn check_width<T: SignalValue>(signal: SignalId, declared: &T, value: &T) -> Result<(), SimError> {
    match (declared.width(), value.width()) {
        (Some(expected), Some(actual)) if expected != actual => Err(SimError::WidthMismatch {
            signal,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysdom_common::{Interner, Logic};
    use sysdom_ir::ProcessId;

    fn store() -> (SignalStore, Interner) {
        (SignalStore::new(), Interner::new())
    }

    fn p(i: u32) -> Writer {
        Writer::Process(ProcessId::from_raw(i))
    }

    #[test]
    fn reads_follow_phase() {
        let (mut s, names) = store();
        let sig = s.insert(names.intern("a"), EventId::from_raw(0), 3u32);
        assert!(matches!(
            s.cur(&sig),
            Err(SimError::PhaseViolation { phase: Phase::Construction, .. })
        ));
        assert_eq!(s.initial(&sig).unwrap(), 3);
        s.set_phase(Phase::DesignAnalysis);
        assert_eq!(s.cur(&sig).unwrap(), 3);
        assert_eq!(s.pre(&sig).unwrap(), 3);
        s.set_phase(Phase::Elaboration);
        assert!(s.pre(&sig).is_err());
    }

    #[test]
    fn writes_are_staged_until_commit() {
        let (mut s, names) = store();
        let sig = s.insert(names.intern("a"), EventId::from_raw(0), Logic::Zero);
        s.set_phase(Phase::Simulation);
        s.write(&sig, Logic::One, p(0)).unwrap();
        assert_eq!(s.cur(&sig).unwrap(), Logic::Zero);
        let commits = s.commit();
        assert_eq!(commits.len(), 1);
        assert!(commits[0].1.changed);
        assert_eq!(s.cur(&sig).unwrap(), Logic::One);
        assert_eq!(s.pre(&sig).unwrap(), Logic::Zero);
    }

    #[test]
    fn unchanged_write_still_shifts_previous() {
        let (mut s, names) = store();
        let sig = s.insert(names.intern("a"), EventId::from_raw(0), 1u8);
        s.set_phase(Phase::Simulation);
        s.write(&sig, 2, p(0)).unwrap();
        s.commit();
        s.write(&sig, 2, p(0)).unwrap();
        let commits = s.commit();
        assert!(!commits[0].1.changed);
        assert_eq!(s.pre(&sig).unwrap(), 2);
        assert_eq!(s.cur(&sig).unwrap(), 2);
    }

    #[test]
    fn untouched_signals_are_not_committed() {
        let (mut s, names) = store();
        let a = s.insert(names.intern("a"), EventId::from_raw(0), 0u8);
        let b = s.insert(names.intern("b"), EventId::from_raw(1), 0u8);
        s.set_phase(Phase::Simulation);
        s.write(&a, 1, p(0)).unwrap();
        let commits = s.commit();
        assert_eq!(commits.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![a.id()]);
        assert_eq!(s.cur(&b).unwrap(), 0);
        assert!(!s.has_staged());
    }

    #[test]
    fn analysis_writes_are_dropped() {
        let (mut s, names) = store();
        let sig = s.insert(names.intern("a"), EventId::from_raw(0), 0u8);
        s.set_phase(Phase::DesignAnalysis);
        s.write(&sig, 9, p(0)).unwrap();
        assert!(!s.has_staged());
        s.set_phase(Phase::Elaboration);
        assert!(s.write(&sig, 9, p(0)).is_err());
    }

    #[test]
    fn width_checked_against_initial() {
        let (mut s, names) = store();
        let sig = s.insert(names.intern("bus"), EventId::from_raw(0), LogicVec::zeros(8));
        s.set_phase(Phase::Simulation);
        let err = s.write(&sig, LogicVec::zeros(4), p(0)).unwrap_err();
        assert!(matches!(err, SimError::WidthMismatch { expected: 8, actual: 4, .. }));
    }

    #[test]
    fn foreign_type_is_rejected() {
        let (mut s, names) = store();
        let sig = s.insert(names.intern("a"), EventId::from_raw(0), 0u8);
        let wrong: SignalRef<u32> = SignalRef::new(sig.id());
        s.set_phase(Phase::Simulation);
        assert!(matches!(s.cur(&wrong), Err(SimError::TypeMismatch { .. })));
    }

    #[test]
    fn ordinary_signal_tracks_distinct_writers() {
        let (mut s, names) = store();
        let sig = s.insert(names.intern("a"), EventId::from_raw(0), 0u8);
        s.set_phase(Phase::Simulation);
        s.write(&sig, 1, p(1)).unwrap();
        s.write(&sig, 2, p(1)).unwrap();
        s.write(&sig, 3, p(4)).unwrap();
        let commits = s.commit();
        assert_eq!(commits[0].1.writers, vec![p(1), p(4)]);
        assert_eq!(s.cur(&sig).unwrap(), 3);
    }

    #[test]
    fn resolved_signal_folds_drivers() {
        let (mut s, names) = store();
        let bus = s.insert_resolved(names.intern("bus"), EventId::from_raw(0), Logic::Z);
        s.set_phase(Phase::Simulation);
        s.write(&bus, Logic::Zero, p(0)).unwrap();
        s.write(&bus, Logic::Z, p(1)).unwrap();
        s.commit();
        assert_eq!(s.cur(&bus).unwrap(), Logic::Zero);

        s.write(&bus, Logic::One, p(0)).unwrap();
        s.write(&bus, Logic::Zero, p(1)).unwrap();
        let commits = s.commit();
        assert!(commits[0].1.writers.is_empty());
        assert_eq!(s.cur(&bus).unwrap(), Logic::X);
    }

    #[test]
    fn set_initial_resets_history() {
        let (mut s, names) = store();
        let sig = s.insert(names.intern("a"), EventId::from_raw(0), 0u8);
        s.set_initial(&sig, 7).unwrap();
        s.set_phase(Phase::DesignAnalysis);
        assert_eq!(s.cur(&sig).unwrap(), 7);
        s.set_phase(Phase::Simulation);
        assert!(s.set_initial(&sig, 1).is_err());
        assert_eq!(s.pre(&sig).unwrap(), 7);
    }
}

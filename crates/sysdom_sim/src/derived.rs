//! Read-only signals computed from other signals.
//!
//! A [`DerivedSignal`] stores no value. Reading it evaluates its expression
//! over the current (or previous) values of its source signals, so it obeys
//! the same phase rules as the sources. Processes that depend on one list
//! [`DerivedSignal::changed_events`] in their sensitivity.
//!
//! ```ignore
//! let sum = derived::add(&a, &b);
//! let odd = sum.map(|v: u32| v % 2 == 1);
//! kernel.triggered_process("watch", sum.changed_events(&kernel)?, move |ctx| {
//!     let now = sum.cur(ctx.signals())?;
//!     ...
//! })?;
//! ```

use std::fmt;
use std::ops::{Add, BitAnd, BitOr, BitXor, Not, Sub};
use std::rc::Rc;

use sysdom_ir::{EventId, SignalId};

use crate::error::SimError;
use crate::kernel::Kernel;
use crate::signal::{SignalRef, SignalStore};
use crate::value::SignalValue;

/// Which committed value a read refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// `Current`.
    Current,
    /// `Previous`.
    Previous,
}

/// Anything a derived signal can be computed from.
pub trait Source<T>: Clone + 'static {
    /// Reads the source.
    fn sample(&self, store: &SignalStore, which: Sample) -> Result<T, SimError>;

    /// The signals the value depends on.
    fn sources(&self) -> Vec<SignalId>;
}

impl<T: SignalValue> Source<T> for SignalRef<T> {
    fn sample(&self, store: &SignalStore, which: Sample) -> Result<T, SimError> {
        match which {
            Sample::Current => store.cur(self),
            Sample::Previous => store.pre(self),
        }
    }

    fn sources(&self) -> Vec<SignalId> {
        vec![self.id()]
    }
}

type Eval<T> = Rc<dyn Fn(&SignalStore, Sample) -> Result<T, SimError>>;

/// A value computed on read from one or more signals.
pub struct DerivedSignal<T> {
    eval: Eval<T>,
    sources: Vec<SignalId>,
}

impl<T> Clone for DerivedSignal<T> {
    fn clone(&self) -> Self {
        Self {
            eval: Rc::clone(&self.eval),
            sources: self.sources.clone(),
        }
    }
}

impl<T> fmt::Debug for DerivedSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedSignal")
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> DerivedSignal<T> {
    fn new(
        sources: Vec<SignalId>,
        eval: impl Fn(&SignalStore, Sample) -> Result<T, SimError> + 'static,
    ) -> Self {
        let mut sources = sources;
        sources.sort();
        sources.dedup();
        Self {
            eval: Rc::new(eval),
            sources,
        }
    }

    /// The value computed from the sources' current values.
    pub fn cur(&self, store: &SignalStore) -> Result<T, SimError> {
        (self.eval)(store, Sample::Current)
    }

    /// The value computed from the sources' previous values.
    pub fn pre(&self, store: &SignalStore) -> Result<T, SimError> {
        (self.eval)(store, Sample::Previous)
    }

    /// Source signals, sorted and deduplicated.
    pub fn source_ids(&self) -> &[SignalId] {
        &self.sources
    }

    /// The `changed` events of every source, for use as sensitivity.
    pub fn changed_events(&self, kernel: &Kernel) -> Result<Vec<EventId>, SimError> {
        self.sources.iter().map(|s| kernel.changed_event(*s)).collect()
    }

    /// Applies `f` to this signal's value.
    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> DerivedSignal<U> {
        map(self, f)
    }
}

impl<T: 'static> Source<T> for DerivedSignal<T> {
    fn sample(&self, store: &SignalStore, which: Sample) -> Result<T, SimError> {
        (self.eval)(store, which)
    }

    fn sources(&self) -> Vec<SignalId> {
        self.sources.clone()
    }
}

/// `f(a)`.
pub fn map<A, U, S>(a: &S, f: impl Fn(A) -> U + 'static) -> DerivedSignal<U>
where
    S: Source<A>,
    U: 'static,
{
    let a = a.clone();
    DerivedSignal::new(a.sources(), move |store, which| Ok(f(a.sample(store, which)?)))
}

/// `f(a, b)`.
pub fn map2<A, B, U, SA, SB>(a: &SA, b: &SB, f: impl Fn(A, B) -> U + 'static) -> DerivedSignal<U>
where
    SA: Source<A>,
    SB: Source<B>,
    U: 'static,
{
    let (a, b) = (a.clone(), b.clone());
    let mut sources = a.sources();
    sources.extend(b.sources());
    DerivedSignal::new(sources, move |store, which| {
        Ok(f(a.sample(store, which)?, b.sample(store, which)?))
    })
}

/// `a + b`.
pub fn add<T, SA, SB>(a: &SA, b: &SB) -> DerivedSignal<T>
where
    T: Add<Output = T> + 'static,
    SA: Source<T>,
    SB: Source<T>,
{
    map2(a, b, |x: T, y: T| x + y)
}

/// `a - b`.
pub fn sub<T, SA, SB>(a: &SA, b: &SB) -> DerivedSignal<T>
where
    T: Sub<Output = T> + 'static,
    SA: Source<T>,
    SB: Source<T>,
{
    map2(a, b, |x: T, y: T| x - y)
}

/// Bitwise `a & b`.
pub fn and<T, SA, SB>(a: &SA, b: &SB) -> DerivedSignal<T>
where
    T: BitAnd<Output = T> + 'static,
    SA: Source<T>,
    SB: Source<T>,
{
    map2(a, b, |x: T, y: T| x & y)
}

/// Bitwise `a | b`.
pub fn or<T, SA, SB>(a: &SA, b: &SB) -> DerivedSignal<T>
where
    T: BitOr<Output = T> + 'static,
    SA: Source<T>,
    SB: Source<T>,
{
    map2(a, b, |x: T, y: T| x | y)
}

/// Bitwise `a ^ b`.
pub fn xor<T, SA, SB>(a: &SA, b: &SB) -> DerivedSignal<T>
where
    T: BitXor<Output = T> + 'static,
    SA: Source<T>,
    SB: Source<T>,
{
    map2(a, b, |x: T, y: T| x ^ y)
}

/// `!a`.
pub fn not<T, S>(a: &S) -> DerivedSignal<T>
where
    T: Not<Output = T> + 'static,
    S: Source<T>,
{
    map(a, |x: T| !x)
}

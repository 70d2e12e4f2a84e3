//! The design context: object arenas, the phase machine and the scheduler.
//!
//! # Scheduling
//!
//! A time step runs a sequence of delta cycles. Each delta cycle:
//!
//! 1. dispatches fired events and due wake-ups into the ready set,
//! 2. runs every ready process once, in ascending process ID order,
//! 3. commits all staged signal writes and fires the `changed` event of each
//!    signal whose value moved,
//! 4. runs the `NextDeltaCycle` handlers.
//!
//! The step ends when a dispatch leaves nothing ready and nothing is staged.
//! Time then advances to the earliest queued entry. `max_deltas` bounds the
//! number of delta cycles per step.

use std::any::Any;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::rc::Rc;

use sysdom_common::{Interner, Logic, Resolve, Time};
use sysdom_config::ResolvedSettings;
use sysdom_diagnostics::{Issue, IssueCode, IssueSink, Severity};
use sysdom_ir::{Arena, ComponentId, EventId, PortId, ProcessId, ProcessKind, SignalId};
use tracing::{debug, error, info, trace, warn};

use crate::component::{ComponentHook, ComponentNode, PortNode};
use crate::context::{NextTrigger, ProcessContext};
use crate::error::SimError;
use crate::event::{EventSource, EventTable, Guard};
use crate::lifecycle::{HookEntry, Hooks, Lifecycle};
use crate::phase::Phase;
use crate::process::{Arm, Body, Countdown, LocalInit, LocalSlot, ProcessNode, Step, Thread, Wait};
use crate::signal::{SignalRef, SignalStore};
use crate::time::SimTime;
use crate::value::{SignalValue, Writer};
use crate::waveform::{VcdRecorder, WaveformRecorder};
use crate::SimConfig;

/// Why a run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing left to do: no queued entries, nothing ready.
    Idle,
    /// The next queued entry lies past the requested limit.
    TimeLimit,
    /// A process or handler requested a stop; the kernel is now stopped.
    Stopped,
}

/// Scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Time advances.
    pub time_steps: u64,
    /// Delta cycles executed.
    pub delta_cycles: u64,
    /// Process body executions.
    pub activations: u64,
}

enum Action {
    Wake { process: ProcessId, token: u64 },
    Fire(EventId),
}

struct Scheduled {
    fs: u64,
    seq: u64,
    action: Action,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.fs == other.fs && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The simulation kernel and owner of every design object.
pub struct Kernel {
    pub(crate) config: SimConfig,
    pub(crate) phase: Phase,
    pub(crate) names: Interner,
    pub(crate) issues: IssueSink,
    pub(crate) signals: SignalStore,
    pub(crate) events: EventTable,
    pub(crate) processes: Arena<ProcessId, ProcessNode>,
    pub(crate) components: Arena<ComponentId, ComponentNode>,
    pub(crate) ports: Arena<PortId, PortNode>,
    pub(crate) hooks: Hooks,
    queue: BinaryHeap<Reverse<Scheduled>>,
    seq: u64,
    now: SimTime,
    ready: BTreeSet<ProcessId>,
    fired: BTreeSet<EventId>,
    immediate: Vec<(ProcessId, u64)>,
    edges: HashMap<(SignalId, bool), EventId>,
    local_inits: Vec<LocalInit>,
    stop_requested: bool,
    recorder: Option<Box<dyn WaveformRecorder>>,
    stats: SimStats,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Kernel {
    /// Creates an empty kernel in the construction phase.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            phase: Phase::Construction,
            names: Interner::new(),
            issues: IssueSink::new(),
            signals: SignalStore::new(),
            events: EventTable::default(),
            processes: Arena::new(),
            components: Arena::new(),
            ports: Arena::new(),
            hooks: Hooks::default(),
            queue: BinaryHeap::new(),
            seq: 0,
            now: SimTime::zero(),
            ready: BTreeSet::new(),
            fired: BTreeSet::new(),
            immediate: Vec::new(),
            edges: HashMap::new(),
            local_inits: Vec::new(),
            stop_requested: false,
            recorder: None,
            stats: SimStats::default(),
        }
    }

    /// Creates a kernel from resolved project settings, opening the VCD
    /// file when waveform recording is enabled.
    pub fn from_settings(settings: &ResolvedSettings) -> Result<Self, SimError> {
        let mut kernel = Self::new(SimConfig::from_settings(settings));
        if let Some(path) = &settings.waveform {
            debug!(path = %path.display(), "recording waveform");
            kernel.set_recorder(Box::new(VcdRecorder::create(path)?))?;
        }
        Ok(kernel)
    }

    /// Kernel settings.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The issue channel.
    pub fn issues(&self) -> &IssueSink {
        &self.issues
    }

    /// Name table.
    pub fn names(&self) -> &Interner {
        &self.names
    }

    /// Read access to signal values.
    pub fn signals(&self) -> &SignalStore {
        &self.signals
    }

    /// Scheduler counters.
    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub(crate) fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
        self.signals.set_phase(phase);
    }

    pub(crate) fn require_phase(
        &self,
        allowed: &[Phase],
        operation: &'static str,
    ) -> Result<(), SimError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(SimError::PhaseViolation {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Records an issue and mirrors it to the log. Issues raised during
    /// design analysis are dropped.
    pub fn report(&self, mut issue: Issue) {
        if self.phase == Phase::DesignAnalysis {
            trace!(code = %issue.code, "issue suppressed during analysis");
            return;
        }
        if issue.at.is_none() && self.phase == Phase::Simulation {
            issue.at = Some(self.now.to_string());
        }
        let path = issue.path.as_deref().unwrap_or("-");
        match issue.severity {
            Severity::Error => error!(code = %issue.code, path, "{}", issue.message),
            Severity::Warning => warn!(code = %issue.code, path, "{}", issue.message),
            Severity::Info => info!(code = %issue.code, path, "{}", issue.message),
        }
        self.issues.emit(issue);
    }

    // ---------------------------------------------------------------------
    // Signals and events
    // ---------------------------------------------------------------------

    /// Creates an ordinary signal.
    pub fn signal<T: SignalValue>(&mut self, name: &str, initial: T) -> Result<SignalRef<T>, SimError> {
        self.require_phase(STRUCTURE, "create signal")?;
        let changed = self.events.plain(Some(EventSource::Changed(self.signals.nodes.next_id())));
        let name = self.names.intern(name);
        Ok(self.signals.insert(name, changed, initial))
    }

    /// Creates a signal that folds the values of all its writers with
    /// [`Resolve`] at commit time.
    pub fn resolved_signal<T: SignalValue + Resolve>(
        &mut self,
        name: &str,
        initial: T,
    ) -> Result<SignalRef<T>, SimError> {
        self.require_phase(STRUCTURE, "create signal")?;
        let changed = self.events.plain(Some(EventSource::Changed(self.signals.nodes.next_id())));
        let name = self.names.intern(name);
        Ok(self.signals.insert_resolved(name, changed, initial))
    }

    /// Replaces a signal's initial value. Legal during construction and
    /// design analysis.
    pub fn set_initial<T: SignalValue>(&mut self, signal: &SignalRef<T>, value: T) -> Result<(), SimError> {
        self.signals.set_initial(signal, value)?;
        if let Ok(node) = self.signals.node_mut(signal.id()) {
            node.descriptor.take();
        }
        Ok(())
    }

    /// Committed value.
    pub fn cur<T: SignalValue>(&self, signal: &SignalRef<T>) -> Result<T, SimError> {
        self.signals.cur(signal)
    }

    /// Value before the last commit.
    pub fn pre<T: SignalValue>(&self, signal: &SignalRef<T>) -> Result<T, SimError> {
        self.signals.pre(signal)
    }

    /// Initial value.
    pub fn initial<T: SignalValue>(&self, signal: &SignalRef<T>) -> Result<T, SimError> {
        self.signals.initial(signal)
    }

    /// Stages a write from outside any process, e.g. a testbench setting
    /// inputs between runs. It is committed in the next delta cycle.
    pub fn write<T: SignalValue>(&mut self, signal: &SignalRef<T>, value: T) -> Result<(), SimError> {
        self.signals.write(signal, value, Writer::External)
    }

    pub(crate) fn write_as<T: SignalValue>(
        &mut self,
        signal: &SignalRef<T>,
        value: T,
        writer: Writer,
    ) -> Result<(), SimError> {
        self.signals.write(signal, value, writer)
    }

    /// The event fired whenever the signal's committed value changes.
    pub fn changed<T>(&self, signal: &SignalRef<T>) -> Result<EventId, SimError> {
        self.changed_event(signal.id())
    }

    pub(crate) fn changed_event(&self, signal: SignalId) -> Result<EventId, SimError> {
        Ok(self.signals.node(signal)?.changed)
    }

    /// Creates a plain event.
    pub fn event(&mut self) -> EventId {
        self.events.plain(None)
    }

    /// An event that fires whenever any of `events` fires. A waiter on it is
    /// woken once per wait.
    pub fn multi_event(&mut self, events: impl IntoIterator<Item = EventId>) -> Result<EventId, SimError> {
        self.events.multi(events.into_iter().collect())
    }

    /// An event that passes a firing of `base` only while `guard` holds.
    pub fn predicated_event(
        &mut self,
        base: EventId,
        guard: impl Fn(&SignalStore) -> Result<bool, SimError> + 'static,
    ) -> Result<EventId, SimError> {
        self.events.predicated(base, Rc::new(guard), None)
    }

    /// Rising edge of a single-bit signal: it changed and is now `1`.
    pub fn rising_edge(&mut self, clk: &SignalRef<Logic>) -> Result<EventId, SimError> {
        self.edge(clk, true)
    }

    /// Falling edge of a single-bit signal: it changed and is now `0`.
    pub fn falling_edge(&mut self, clk: &SignalRef<Logic>) -> Result<EventId, SimError> {
        self.edge(clk, false)
    }

    fn edge(&mut self, clk: &SignalRef<Logic>, rising: bool) -> Result<EventId, SimError> {
        if let Some(event) = self.edges.get(&(clk.id(), rising)) {
            return Ok(*event);
        }
        self.signals.initial(clk)?;
        let changed = self.changed(clk)?;
        let clk = *clk;
        let level = if rising { Logic::One } else { Logic::Zero };
        let guard: Guard = Rc::new(move |s: &SignalStore| Ok(s.cur(&clk)? == level));
        let source = if rising {
            EventSource::Rising(clk.id())
        } else {
            EventSource::Falling(clk.id())
        };
        let event = self.events.predicated(changed, guard, Some(source))?;
        self.edges.insert((clk.id(), rising), event);
        Ok(event)
    }

    /// Fires a plain event; its waiters run in the next delta cycle.
    pub fn fire(&mut self, event: EventId) -> Result<(), SimError> {
        self.require_phase(&[Phase::Simulation], "fire event")?;
        if !self.events.is_plain(event)? {
            return Err(SimError::NotFireable(event));
        }
        self.fired.insert(event);
        Ok(())
    }

    /// Fires a plain event `delay` after the current time.
    pub fn notify_after(&mut self, event: EventId, delay: Time) -> Result<(), SimError> {
        self.require_phase(&[Phase::Elaboration, Phase::Simulation], "notify event")?;
        if !self.events.is_plain(event)? {
            return Err(SimError::NotFireable(event));
        }
        if delay.is_zero() && self.phase == Phase::Simulation {
            self.fired.insert(event);
            return Ok(());
        }
        let fs = self.deadline(delay)?;
        self.schedule(fs, Action::Fire(event));
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Processes
    // ---------------------------------------------------------------------

    /// Starts registering a process.
    pub fn process(&mut self, name: &str) -> ProcessBuilder<'_> {
        ProcessBuilder {
            kernel: self,
            name: name.to_string(),
            owner: None,
            sensitivity: Vec::new(),
            predicate: None,
        }
    }

    /// Registers a triggered process.
    pub fn triggered_process(
        &mut self,
        name: &str,
        sensitivity: impl IntoIterator<Item = EventId>,
        body: impl FnMut(&mut ProcessContext<'_>) -> Result<(), SimError> + 'static,
    ) -> Result<ProcessId, SimError> {
        self.process(name).sensitive_to(sensitivity).triggered(body)
    }

    /// Registers a triggered process that only runs while `predicate` holds.
    pub fn clocked_process(
        &mut self,
        name: &str,
        sensitivity: impl IntoIterator<Item = EventId>,
        predicate: impl Fn(&SignalStore) -> Result<bool, SimError> + 'static,
        body: impl FnMut(&mut ProcessContext<'_>) -> Result<(), SimError> + 'static,
    ) -> Result<ProcessId, SimError> {
        self.process(name)
            .sensitive_to(sensitivity)
            .predicate(predicate)
            .triggered(body)
    }

    /// Registers a threaded process.
    pub fn thread(
        &mut self,
        name: &str,
        sensitivity: impl IntoIterator<Item = EventId>,
        thread: impl Thread + 'static,
    ) -> Result<ProcessId, SimError> {
        self.process(name).sensitive_to(sensitivity).threaded(thread)
    }

    /// Registers a threaded process whose ticks only count while
    /// `predicate` holds.
    pub fn clocked_thread(
        &mut self,
        name: &str,
        sensitivity: impl IntoIterator<Item = EventId>,
        predicate: impl Fn(&SignalStore) -> Result<bool, SimError> + 'static,
        thread: impl Thread + 'static,
    ) -> Result<ProcessId, SimError> {
        self.process(name)
            .sensitive_to(sensitivity)
            .predicate(predicate)
            .threaded(thread)
    }

    fn register(&mut self, spec: ProcessSpec, kind: ProcessKind, body: Body) -> Result<ProcessId, SimError> {
        self.require_phase(&[Phase::Construction, Phase::Elaboration], "register process")?;
        for event in &spec.sensitivity {
            self.events.check(*event)?;
        }
        if let Some(owner) = spec.owner {
            self.component_node(owner)?;
        }
        if spec.predicate.is_some() && spec.sensitivity.is_empty() {
            let process = match spec.owner {
                Some(owner) => format!("{}.{}", self.component_path(owner), spec.name),
                None => spec.name.clone(),
            };
            return Err(SimError::NotClocked { process });
        }
        let id = self.processes.alloc(ProcessNode {
            name: self.names.intern(&spec.name),
            owner: spec.owner,
            kind,
            declared: spec.sensitivity.clone(),
            sensitivity: spec.sensitivity,
            predicate: spec.predicate,
            body: Some(body),
            locals: Vec::new(),
            token: 0,
            countdown: None,
            wakes: 0,
        });
        if let Some(owner) = spec.owner {
            self.components[owner].processes.push(id);
        }
        debug!(process = %self.process_path(id), ?kind, "registered process");
        Ok(id)
    }

    /// Declares a process-local storage slot. Every process gets its own
    /// copy of `init` when simulation starts.
    pub fn alloc_local<T: Clone + 'static>(&mut self, init: T) -> Result<LocalSlot<T>, SimError> {
        self.require_phase(&[Phase::Construction], "allocate process-local storage")?;
        self.local_inits
            .push(Box::new(move || Box::new(init.clone()) as Box<dyn Any>));
        Ok(LocalSlot::new(self.local_inits.len() - 1))
    }

    /// How many times the process body has been executed.
    pub fn wake_count(&self, process: ProcessId) -> Result<u64, SimError> {
        self.processes
            .try_get(process)
            .map(|p| p.wakes)
            .ok_or(SimError::UnknownObject {
                kind: "process",
                index: process.as_raw(),
            })
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Registers a lifecycle handler.
    pub fn on(
        &mut self,
        stage: Lifecycle,
        handler: impl FnMut(&mut Kernel) -> Result<(), SimError> + 'static,
    ) -> Result<(), SimError> {
        if self.phase == Phase::Stopped {
            return Err(SimError::PhaseViolation {
                operation: "register lifecycle handler",
                phase: self.phase,
            });
        }
        self.hooks.push(stage, HookEntry::Closure(Box::new(handler)));
        Ok(())
    }

    /// Installs a waveform recorder. Signals are declared to it when
    /// simulation starts.
    pub fn set_recorder(&mut self, recorder: Box<dyn WaveformRecorder>) -> Result<(), SimError> {
        self.require_phase(STRUCTURE, "install waveform recorder")?;
        self.recorder = Some(recorder);
        Ok(())
    }

    pub(crate) fn run_lifecycle(&mut self, stage: Lifecycle) -> Result<(), SimError> {
        if self.hooks.len(stage) > 0 && stage != Lifecycle::NextDeltaCycle {
            debug!(%stage, handlers = self.hooks.len(stage), "lifecycle");
        }
        let mut index = 0;
        while let Some(mut entry) = self.hooks.take(stage, index) {
            let result = match &mut entry {
                HookEntry::Closure(handler) => handler(self),
                HookEntry::Component(id) => match ComponentHook::for_stage(stage) {
                    Some(hook) => self.invoke_component(*id, hook),
                    None => Ok(()),
                },
                HookEntry::Running => Ok(()),
            };
            self.hooks.restore(stage, index, entry);
            result?;
            index += 1;
        }
        Ok(())
    }

    /// Runs the construction-to-simulation sequence: end-of-construction
    /// handlers, design analysis, component initialization and the port
    /// checks, then starts every process at time zero.
    pub fn elaborate(&mut self) -> Result<(), SimError> {
        if self.phase != Phase::Construction {
            return Err(SimError::AlreadyElaborated);
        }
        self.run_lifecycle(Lifecycle::EndOfConstruction)?;
        self.enter(Phase::DesignAnalysis);
        self.run_lifecycle(Lifecycle::Analysis)?;
        self.enter(Phase::Elaboration);
        for id in self.preorder() {
            self.invoke_component(id, ComponentHook::PreInitialize)?;
        }
        self.run_lifecycle(Lifecycle::Elaborate)?;
        self.run_lifecycle(Lifecycle::EndOfElaboration)?;

        let errors = self.issues.error_count();
        if errors > 0 && self.config.halt_on_error {
            error!(errors, "elaboration failed");
            return Err(SimError::ElaborationFailed { errors });
        }

        for (_, node) in self.processes.iter_mut() {
            node.locals = self.local_inits.iter().map(|init| init()).collect();
        }
        self.enter(Phase::Simulation);
        self.open_waveform()?;
        let ids: Vec<ProcessId> = self.processes.ids().collect();
        for pid in ids {
            if self.processes[pid].predicate.is_some() {
                self.arm(pid, &Arm::Sensitivity)?;
            } else {
                self.ready.insert(pid);
            }
        }
        info!(
            components = self.components.len(),
            signals = self.signals.len(),
            processes = self.processes.len(),
            "elaboration complete"
        );
        Ok(())
    }

    fn open_waveform(&mut self) -> Result<(), SimError> {
        let Some(mut recorder) = self.recorder.take() else {
            return Ok(());
        };
        let result = self.declare_waveform(recorder.as_mut());
        self.recorder = Some(recorder);
        result
    }

    fn declare_waveform(&self, rec: &mut dyn WaveformRecorder) -> Result<(), SimError> {
        let mut declared = Vec::new();
        rec.begin_scope("design")?;
        for root in self.roots() {
            self.declare_scope(rec, root, &mut declared)?;
        }
        for (id, node) in self.signals.nodes.iter() {
            if node.owner.is_none() {
                self.declare_signal(rec, id, &mut declared)?;
            }
        }
        rec.end_scope()?;
        for id in declared {
            if let Some(bits) = self.signals.current_bits(id) {
                rec.record_change(self.now.fs, id, &bits)?;
            }
        }
        Ok(())
    }

    fn declare_scope(
        &self,
        rec: &mut dyn WaveformRecorder,
        component: ComponentId,
        declared: &mut Vec<SignalId>,
    ) -> Result<(), SimError> {
        let node = &self.components[component];
        rec.begin_scope(&format!("{}{}", self.names.resolve(node.name), node.index))?;
        for signal in &node.signals {
            self.declare_signal(rec, *signal, declared)?;
        }
        for child in &node.children {
            self.declare_scope(rec, *child, declared)?;
        }
        rec.end_scope()
    }

    fn declare_signal(
        &self,
        rec: &mut dyn WaveformRecorder,
        id: SignalId,
        declared: &mut Vec<SignalId>,
    ) -> Result<(), SimError> {
        let Some(bits) = self.signals.current_bits(id) else {
            return Ok(());
        };
        let node = self.signals.node(id)?;
        let name = format!("{}{}", self.names.resolve(node.name), node.index);
        rec.register_signal(id, &name, bits.width())?;
        declared.push(id);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Running
    // ---------------------------------------------------------------------

    /// Runs until idle, or until the configured time limit.
    pub fn run(&mut self) -> Result<RunOutcome, SimError> {
        let limit = self.config.time_limit.map(Time::as_fs);
        self.run_bounded(limit)
    }

    /// Runs every time step up to and including `until`. Simulated time ends
    /// at `until` unless the run stopped earlier.
    pub fn run_until(&mut self, until: Time) -> Result<RunOutcome, SimError> {
        self.run_bounded(Some(until.as_fs()))
    }

    /// Runs for `span` of simulated time from now.
    pub fn run_for(&mut self, span: Time) -> Result<RunOutcome, SimError> {
        let until = self.now.time().checked_add(span).ok_or(SimError::TimeOverflow)?;
        self.run_until(until)
    }

    /// Runs one time step. Returns `false` when there was nothing to do.
    pub fn step(&mut self) -> Result<bool, SimError> {
        self.require_phase(&[Phase::Simulation], "step")?;
        if !self.has_pending_delta() {
            let Some(fs) = self.next_time() else {
                return Ok(false);
            };
            self.advance_to(fs);
        }
        let result = self.run_deltas();
        self.after_run(result)?;
        if self.stop_requested {
            self.stop()?;
        }
        Ok(true)
    }

    /// Requests the kernel to stop once the running delta cycle completes.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Stops the simulation: runs the `SimulationStopped` handlers, enters
    /// [`Phase::Stopped`] and finalizes waveform output.
    pub fn stop(&mut self) -> Result<(), SimError> {
        match self.phase {
            Phase::Stopped => return Ok(()),
            Phase::Simulation => {}
            phase => {
                return Err(SimError::PhaseViolation {
                    operation: "stop",
                    phase,
                })
            }
        }
        self.stop_requested = false;
        self.run_lifecycle(Lifecycle::SimulationStopped)?;
        self.enter(Phase::Stopped);
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.finalize()?;
        }
        info!(
            time = %self.now,
            time_steps = self.stats.time_steps,
            delta_cycles = self.stats.delta_cycles,
            "simulation stopped"
        );
        Ok(())
    }

    fn run_bounded(&mut self, limit: Option<u64>) -> Result<RunOutcome, SimError> {
        self.require_phase(&[Phase::Simulation], "run")?;
        let result = self.run_loop(limit);
        self.after_run(result)
    }

    fn after_run<T>(&mut self, result: Result<T, SimError>) -> Result<T, SimError> {
        if let Err(SimError::Failed { process, reason }) = &result {
            error!(process = %process, reason = %reason, "simulation failed");
            if let Err(err) = self.stop() {
                warn!(%err, "stop handlers failed after process failure");
            }
        }
        result
    }

    fn run_loop(&mut self, limit: Option<u64>) -> Result<RunOutcome, SimError> {
        loop {
            if self.stop_requested {
                self.stop()?;
                return Ok(RunOutcome::Stopped);
            }
            if !self.has_pending_delta() {
                match self.next_time() {
                    None => {
                        self.idle_until(limit);
                        return Ok(RunOutcome::Idle);
                    }
                    Some(fs) if limit.is_some_and(|l| fs > l) => {
                        self.idle_until(limit);
                        return Ok(RunOutcome::TimeLimit);
                    }
                    Some(fs) => self.advance_to(fs),
                }
            }
            self.run_deltas()?;
        }
    }

    fn idle_until(&mut self, limit: Option<u64>) {
        if let Some(limit) = limit.filter(|l| *l > self.now.fs) {
            self.now = self.now.advance_to(limit);
        }
    }

    fn has_pending_delta(&self) -> bool {
        !self.ready.is_empty()
            || !self.fired.is_empty()
            || !self.immediate.is_empty()
            || self.signals.has_staged()
    }

    fn next_time(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(entry)| entry.fs)
    }

    fn advance_to(&mut self, fs: u64) {
        self.now = self.now.advance_to(fs);
        self.stats.time_steps += 1;
        debug!(time = %self.now, "advance time");
        while self.queue.peek().is_some_and(|Reverse(e)| e.fs == fs) {
            let Some(Reverse(entry)) = self.queue.pop() else {
                break;
            };
            match entry.action {
                Action::Wake { process, token } => self.immediate.push((process, token)),
                Action::Fire(event) => {
                    self.fired.insert(event);
                }
            }
        }
    }

    fn schedule(&mut self, fs: u64, action: Action) {
        self.seq += 1;
        self.queue.push(Reverse(Scheduled {
            fs,
            seq: self.seq,
            action,
        }));
    }

    /// Absolute time of `delay` from now, rounded down to the resolution.
    /// Nonzero delays below the resolution round up to one quantum.
    fn deadline(&self, delay: Time) -> Result<u64, SimError> {
        let resolution = self.config.resolution;
        let mut quantized = delay.quantize(resolution);
        if quantized.is_zero() && !delay.is_zero() {
            quantized = resolution;
        }
        self.now
            .time()
            .checked_add(quantized)
            .map(Time::as_fs)
            .ok_or(SimError::TimeOverflow)
    }

    pub(crate) fn wake_after(&mut self, process: ProcessId, delay: Time) -> Result<(), SimError> {
        let token = self.processes[process].token;
        if delay.is_zero() {
            self.immediate.push((process, token));
            return Ok(());
        }
        let fs = self.deadline(delay)?;
        self.schedule(fs, Action::Wake { process, token });
        Ok(())
    }

    fn run_deltas(&mut self) -> Result<(), SimError> {
        let mut deltas = 0u32;
        loop {
            self.dispatch()?;
            if self.ready.is_empty() && !self.signals.has_staged() {
                return Ok(());
            }
            if deltas >= self.config.max_deltas {
                error!(time = %self.now, max = self.config.max_deltas, "delta cycle limit");
                return Err(SimError::DeltaCycleLimit {
                    fs: self.now.fs,
                    max_deltas: self.config.max_deltas,
                });
            }
            let batch = std::mem::take(&mut self.ready);
            trace!(time = %self.now, ready = batch.len(), "delta cycle");
            for pid in batch {
                self.run_process(pid)?;
            }
            self.commit()?;
            self.run_lifecycle(Lifecycle::NextDeltaCycle)?;
            self.now = self.now.next_delta();
            deltas += 1;
            self.stats.delta_cycles += 1;
            if self.stop_requested {
                return Ok(());
            }
        }
    }

    fn dispatch(&mut self) -> Result<(), SimError> {
        for (pid, token) in std::mem::take(&mut self.immediate) {
            if self.processes[pid].token == token {
                self.wake(pid)?;
            }
        }
        for event in std::mem::take(&mut self.fired) {
            for waiter in self.events.take_waiters(event) {
                if self.processes[waiter.process].token != waiter.token {
                    continue;
                }
                let mut pass = true;
                for guard in &waiter.guards {
                    if !guard(&self.signals)? {
                        pass = false;
                        break;
                    }
                }
                if pass {
                    self.wake(waiter.process)?;
                } else {
                    self.events.rearm(event, waiter);
                }
            }
        }
        Ok(())
    }

    fn wake(&mut self, pid: ProcessId) -> Result<(), SimError> {
        let node = &mut self.processes[pid];
        node.token += 1;
        if let Some(countdown) = node.countdown.as_mut() {
            if countdown.remaining > 1 {
                countdown.remaining -= 1;
                let arm = countdown.arm.clone();
                return self.arm(pid, &arm);
            }
            node.countdown = None;
        }
        self.ready.insert(pid);
        Ok(())
    }

    fn arm(&mut self, pid: ProcessId, arm: &Arm) -> Result<(), SimError> {
        let node = &self.processes[pid];
        let token = node.token;
        let (events, guards) = match arm {
            Arm::Sensitivity => (
                node.sensitivity.clone(),
                node.predicate.iter().cloned().collect::<Vec<_>>(),
            ),
            Arm::Events(events) => (events.clone(), Vec::new()),
        };
        for event in events {
            self.events.subscribe(event, pid, token, guards.clone())?;
        }
        Ok(())
    }

    fn run_process(&mut self, pid: ProcessId) -> Result<(), SimError> {
        let node = &mut self.processes[pid];
        let Some(mut body) = node.body.take() else {
            return Ok(());
        };
        let mut locals = std::mem::take(&mut node.locals);
        node.wakes += 1;
        self.stats.activations += 1;

        let (result, next) = {
            let mut ctx = ProcessContext::new(self, pid, &mut locals);
            let result = match &mut body {
                Body::Triggered(f) => f(&mut ctx).map(|()| None),
                Body::Threaded(t) => t.resume(&mut ctx).map(Some),
            };
            (result, ctx.into_next_trigger())
        };

        let node = &mut self.processes[pid];
        node.body = Some(body);
        node.locals = locals;
        match result? {
            None => self.after_trigger(pid, next),
            Some(step) => {
                if let Some(next) = next {
                    self.retarget_thread(pid, next);
                }
                self.after_step(pid, step)
            }
        }
    }

    fn after_trigger(&mut self, pid: ProcessId, next: Option<NextTrigger>) -> Result<(), SimError> {
        match next {
            Some(NextTrigger::After(delay)) => {
                self.processes[pid].sensitivity.clear();
                self.wake_after(pid, delay)
            }
            Some(NextTrigger::On(events)) => {
                self.processes[pid].sensitivity = events;
                self.arm(pid, &Arm::Sensitivity)
            }
            None => self.arm(pid, &Arm::Sensitivity),
        }
    }

    fn retarget_thread(&mut self, pid: ProcessId, next: NextTrigger) {
        match next {
            NextTrigger::On(events) => self.processes[pid].sensitivity = events,
            NextTrigger::After(_) => {
                warn!(process = %self.process_path(pid), "timed next trigger ignored for threaded process");
            }
        }
    }

    fn after_step(&mut self, pid: ProcessId, step: Step) -> Result<(), SimError> {
        match step {
            Step::EndOfBody => {
                if self.processes[pid].sensitivity.is_empty() {
                    return Err(SimError::BusyProcess {
                        process: self.process_path(pid),
                    });
                }
                self.arm(pid, &Arm::Sensitivity)
            }
            Step::Wait(Wait::Tick) => self.wait_ticks(pid, 1),
            Step::Wait(Wait::Ticks(n)) => self.wait_ticks(pid, n.max(1)),
            Step::Wait(Wait::Event(event)) => self.wait_events(pid, vec![event], 1),
            Step::Wait(Wait::Repeat(event, n)) => self.wait_events(pid, vec![event], n.max(1)),
            Step::Wait(Wait::AnyOf(events)) => self.wait_events(pid, events, 1),
            Step::Wait(Wait::For(delay)) => self.wake_after(pid, delay),
            Step::Wait(Wait::Forever) => Ok(()),
        }
    }

    fn wait_ticks(&mut self, pid: ProcessId, n: u32) -> Result<(), SimError> {
        if self.processes[pid].sensitivity.is_empty() {
            return Err(SimError::NotClocked {
                process: self.process_path(pid),
            });
        }
        self.processes[pid].countdown = Some(Countdown {
            arm: Arm::Sensitivity,
            remaining: n,
        });
        self.arm(pid, &Arm::Sensitivity)
    }

    fn wait_events(&mut self, pid: ProcessId, events: Vec<EventId>, n: u32) -> Result<(), SimError> {
        for event in &events {
            self.events.check(*event)?;
        }
        let arm = Arm::Events(events);
        self.processes[pid].countdown = Some(Countdown {
            arm: arm.clone(),
            remaining: n,
        });
        self.arm(pid, &arm)
    }

    fn commit(&mut self) -> Result<(), SimError> {
        for (id, commit) in self.signals.commit() {
            if commit.writers.len() > 1 {
                self.multiple_drivers(id, &commit.writers)?;
            }
            if commit.changed {
                self.fired.insert(self.signals.node(id)?.changed);
                if let Some(recorder) = self.recorder.as_mut() {
                    if let Some(bits) = self.signals.current_bits(id) {
                        recorder.record_change(self.now.fs, id, &bits)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn multiple_drivers(&self, signal: SignalId, writers: &[Writer]) -> Result<(), SimError> {
        let path = self.signal_path(signal);
        let names: Vec<String> = writers.iter().map(|w| self.writer_name(*w)).collect();
        if self.config.strict_drivers {
            return Err(SimError::MultipleDrivers {
                signal: path,
                first: names.first().cloned().unwrap_or_default(),
                second: names.get(1).cloned().unwrap_or_default(),
            });
        }
        let mut issue = Issue::error(
            IssueCode::MULTIPLE_DRIVERS,
            format!(
                "signal is driven by {} writers in one delta cycle; the last write wins",
                names.len()
            ),
        )
        .with_path(path);
        for name in names {
            issue = issue.with_note(format!("driver: {name}"));
        }
        self.report(issue);
        Ok(())
    }

    pub(crate) fn writer_name(&self, writer: Writer) -> String {
        match writer {
            Writer::Process(p) => self.process_path(p),
            Writer::External => writer.to_string(),
        }
    }
}

/// Phases in which design objects may still be created.
const STRUCTURE: &[Phase] = &[Phase::Construction, Phase::DesignAnalysis, Phase::Elaboration];

struct ProcessSpec {
    name: String,
    owner: Option<ComponentId>,
    sensitivity: Vec<EventId>,
    predicate: Option<Guard>,
}

/// Builder returned by [`Kernel::process`].
pub struct ProcessBuilder<'k> {
    kernel: &'k mut Kernel,
    name: String,
    owner: Option<ComponentId>,
    sensitivity: Vec<EventId>,
    predicate: Option<Guard>,
}

impl<'k> ProcessBuilder<'k> {
    /// Attaches the process to a component.
    pub fn owner(mut self, owner: ComponentId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Adds events to the static sensitivity list.
    pub fn sensitive_to(mut self, events: impl IntoIterator<Item = EventId>) -> Self {
        self.sensitivity.extend(events);
        self
    }

    /// Only activations for which `predicate` holds wake the process.
    pub fn predicate(
        mut self,
        predicate: impl Fn(&SignalStore) -> Result<bool, SimError> + 'static,
    ) -> Self {
        self.predicate = Some(Rc::new(predicate));
        self
    }

    /// Registers a triggered process.
    pub fn triggered(
        self,
        body: impl FnMut(&mut ProcessContext<'_>) -> Result<(), SimError> + 'static,
    ) -> Result<ProcessId, SimError> {
        let (kernel, spec) = self.split();
        kernel.register(spec, ProcessKind::Triggered, Body::Triggered(Box::new(body)))
    }

    /// Registers a threaded process.
    pub fn threaded(self, thread: impl Thread + 'static) -> Result<ProcessId, SimError> {
        let (kernel, spec) = self.split();
        kernel.register(spec, ProcessKind::Threaded, Body::Threaded(Box::new(thread)))
    }

    /// Registers a threaded process from a closure.
    pub fn thread_fn(
        self,
        resume: impl FnMut(&mut ProcessContext<'_>) -> Result<Step, SimError> + 'static,
    ) -> Result<ProcessId, SimError> {
        self.threaded(resume)
    }

    fn split(self) -> (&'k mut Kernel, ProcessSpec) {
        let spec = ProcessSpec {
            name: self.name,
            owner: self.owner,
            sensitivity: self.sensitivity,
            predicate: self.predicate,
        };
        (self.kernel, spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_sensitivity_does_not_accumulate_waiters() {
        let mut k = Kernel::default();
        let tick = k.event();
        let never = k.event();
        let pid = k
            .triggered_process("pulse", [tick, never], move |ctx| ctx.notify_after(tick, Time::ns(1)))
            .unwrap();
        k.elaborate().unwrap();
        k.run_until(Time::ns(1000)).unwrap();
        assert_eq!(k.wake_count(pid).unwrap(), 1001);
        assert_eq!(k.events.waiter_count(never), 1);
        assert_eq!(k.events.waiter_count(tick), 1);
    }
}

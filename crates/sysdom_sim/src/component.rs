//! Components: the structural tree, single ownership, ports and descriptors.
//!
//! Components, signals and processes are stored in kernel arenas and linked by
//! ID. A component or signal gets exactly one owner through
//! [`Kernel::set_owner`]; a second attempt is reported as an issue and the
//! first owner stays. After elaboration [`Kernel::describe`] freezes the
//! tree into a [`DesignDescriptor`] for code generators.

use std::any::Any;

use sysdom_diagnostics::{Issue, IssueCode};
use sysdom_ir::{
    ComponentDescriptor, ComponentId, DeclSite, DesignDescriptor, IndexSpec, PortDescriptor,
    PortDirection, PortId, ProcessDescriptor, ProcessId, SignalDescriptor, SignalId,
};
use tracing::debug;

use crate::error::SimError;
use crate::kernel::Kernel;
use crate::lifecycle::{HookEntry, Lifecycle};
use crate::phase::Phase;
use crate::signal::{SignalNode, SignalRef};
use crate::value::SignalValue;

/// Upcast to [`Any`], implemented for every `'static` type.
pub trait AsAny: Any {
    /// `&self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// `&mut self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// User behavior attached to a component node.
///
/// Every hook receives the kernel and the component's own ID. Hooks run once
/// each, in the order `analyze`, `pre_initialize`, `initialize`,
/// `post_initialize`; `on_stopped` runs when the simulation stops.
#[allow(unused_variables)]
pub trait Component: AsAny {
    /// Design analysis. Signal reads return initial values; writes are dropped.
    fn analyze(&mut self, kernel: &mut Kernel, me: ComponentId) -> Result<(), SimError> {
        Ok(())
    }

    /// First elaboration hook, run for the whole tree in pre-order.
    fn pre_initialize(&mut self, kernel: &mut Kernel, me: ComponentId) -> Result<(), SimError> {
        Ok(())
    }

    /// Registers processes and validates port bindings.
    fn initialize(&mut self, kernel: &mut Kernel, me: ComponentId) -> Result<(), SimError> {
        Ok(())
    }

    /// Runs after every component initialized.
    fn post_initialize(&mut self, kernel: &mut Kernel, me: ComponentId) -> Result<(), SimError> {
        Ok(())
    }

    /// Cleanup when the simulation stops.
    fn on_stopped(&mut self, kernel: &mut Kernel, me: ComponentId) -> Result<(), SimError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ComponentHook {
    Analyze,
    PreInitialize,
    Initialize,
    PostInitialize,
    Stopped,
}

impl ComponentHook {
    pub fn for_stage(stage: Lifecycle) -> Option<Self> {
        match stage {
            Lifecycle::Analysis => Some(ComponentHook::Analyze),
            Lifecycle::Elaborate => Some(ComponentHook::Initialize),
            Lifecycle::EndOfElaboration => Some(ComponentHook::PostInitialize),
            Lifecycle::SimulationStopped => Some(ComponentHook::Stopped),
            Lifecycle::EndOfConstruction | Lifecycle::NextDeltaCycle => None,
        }
    }
}

pub(crate) struct ComponentNode {
    pub name: sysdom_common::Ident,
    pub type_name: &'static str,
    pub parent: Option<ComponentId>,
    pub decl: Option<DeclSite>,
    pub index: IndexSpec,
    pub children: Vec<ComponentId>,
    pub signals: Vec<SignalId>,
    pub processes: Vec<ProcessId>,
    pub ports: Vec<PortId>,
    pub behavior: Option<Box<dyn Component>>,
}

pub(crate) struct PortNode {
    pub name: String,
    pub direction: PortDirection,
    pub width: Option<u32>,
    pub signal: Option<SignalId>,
}

/// An ordered group of sibling components declared in one field.
///
/// Giving the collection an owner gives each item that owner, with its
/// position as index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentCollection {
    items: Vec<ComponentId>,
}

impl ComponentCollection {
    /// Creates a collection.
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items }
    }

    /// Appends an item.
    pub fn push(&mut self, item: ComponentId) {
        self.items.push(item);
    }

    /// The items in order.
    pub fn items(&self) -> &[ComponentId] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<ComponentId> for ComponentCollection {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Something that can be given an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignObject {
    /// A component.
    Component(ComponentId),
    /// A signal.
    Signal(SignalId),
    /// Every item of a collection.
    Collection(ComponentCollection),
}

impl From<ComponentId> for DesignObject {
    fn from(id: ComponentId) -> Self {
        DesignObject::Component(id)
    }
}

impl From<SignalId> for DesignObject {
    fn from(id: SignalId) -> Self {
        DesignObject::Signal(id)
    }
}

impl<T> From<&SignalRef<T>> for DesignObject {
    fn from(signal: &SignalRef<T>) -> Self {
        DesignObject::Signal(signal.id())
    }
}

impl From<&ComponentCollection> for DesignObject {
    fn from(collection: &ComponentCollection) -> Self {
        DesignObject::Collection(collection.clone())
    }
}

impl Kernel {
    /// Adds a component node carrying `behavior`. Its hooks join the
    /// lifecycle lists in registration order.
    pub fn add_component<C: Component>(&mut self, name: &str, behavior: C) -> Result<ComponentId, SimError> {
        self.require_phase(&[Phase::Construction], "add component")?;
        let id = self.components.alloc(ComponentNode {
            name: self.names.intern(name),
            type_name: std::any::type_name::<C>(),
            parent: None,
            decl: None,
            index: IndexSpec::default(),
            children: Vec::new(),
            signals: Vec::new(),
            processes: Vec::new(),
            ports: Vec::new(),
            behavior: Some(Box::new(behavior)),
        });
        for stage in [
            Lifecycle::Analysis,
            Lifecycle::Elaborate,
            Lifecycle::EndOfElaboration,
            Lifecycle::SimulationStopped,
        ] {
            self.hooks.push(stage, HookEntry::Component(id));
        }
        Ok(id)
    }

    /// The behavior of a component, if it has type `C`. `None` while the
    /// component's own hook is running.
    pub fn component<C: Component>(&self, id: ComponentId) -> Option<&C> {
        self.components
            .try_get(id)?
            .behavior
            .as_deref()?
            .as_any()
            .downcast_ref::<C>()
    }

    /// Mutable access to a component's behavior.
    pub fn component_mut<C: Component>(&mut self, id: ComponentId) -> Option<&mut C> {
        self.components
            .try_get_mut(id)?
            .behavior
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<C>()
    }

    pub(crate) fn component_node(&self, id: ComponentId) -> Result<&ComponentNode, SimError> {
        self.components.try_get(id).ok_or(SimError::UnknownObject {
            kind: "component",
            index: id.as_raw(),
        })
    }

    /// Attaches a component, signal or collection to `owner`, declared in
    /// `field` at position `index`.
    ///
    /// Returns `Ok(false)` when the object already had an owner: that is
    /// reported as an error issue naming both declaration sites and the first
    /// owner is kept.
    pub fn set_owner(
        &mut self,
        object: impl Into<DesignObject>,
        owner: ComponentId,
        field: &str,
        index: IndexSpec,
    ) -> Result<bool, SimError> {
        self.require_phase(&[Phase::Construction], "set owner")?;
        self.component_node(owner)?;
        match object.into() {
            DesignObject::Component(child) => self.own_component(child, owner, field, index),
            DesignObject::Signal(signal) => self.own_signal(signal, owner, field, index),
            DesignObject::Collection(collection) => {
                let mut all = true;
                for (i, item) in collection.items().iter().enumerate() {
                    all &= self.own_component(*item, owner, field, IndexSpec::single(i as u32))?;
                }
                Ok(all)
            }
        }
    }

    fn own_component(
        &mut self,
        child: ComponentId,
        owner: ComponentId,
        field: &str,
        index: IndexSpec,
    ) -> Result<bool, SimError> {
        self.component_node(child)?;
        let decl = DeclSite::new(self.component_path(owner), field);
        if child == owner || self.is_ancestor(child, owner) {
            self.report(
                Issue::error(
                    IssueCode::OWNERSHIP_CYCLE,
                    format!("component cannot be declared inside itself ({decl})"),
                )
                .with_path(self.component_path(child)),
            );
            return Ok(false);
        }
        if let Some(first) = &self.components[child].decl {
            self.report(
                Issue::error(
                    IssueCode::MULTIPLE_DECLARATION,
                    format!(
                        "component instance is declared multiple times: first declaration is {first}, second one in {decl}"
                    ),
                )
                .with_path(self.component_path(child)),
            );
            return Ok(false);
        }
        let node = &mut self.components[child];
        node.parent = Some(owner);
        node.decl = Some(decl);
        node.index = index;
        self.components[owner].children.push(child);
        self.forget_signal_descriptors(child);
        debug!(component = %self.component_path(child), "owner set");
        Ok(true)
    }

    /// Drops the cached descriptors of every signal under `root`; their
    /// paths go through `root`'s ancestry.
    fn forget_signal_descriptors(&mut self, root: ComponentId) {
        let mut work = vec![root];
        while let Some(id) = work.pop() {
            let node = &self.components[id];
            work.extend(node.children.iter().copied());
            for signal in node.signals.clone() {
                if let Ok(sig) = self.signals.node_mut(signal) {
                    sig.descriptor.take();
                }
            }
        }
    }

    fn own_signal(
        &mut self,
        signal: SignalId,
        owner: ComponentId,
        field: &str,
        index: IndexSpec,
    ) -> Result<bool, SimError> {
        let decl = DeclSite::new(self.component_path(owner), field);
        if let Some(first) = &self.signals.node(signal)?.decl {
            self.report(
                Issue::error(
                    IssueCode::MULTIPLE_DECLARATION,
                    format!(
                        "signal is declared multiple times: first declaration is {first}, second one in {decl}"
                    ),
                )
                .with_path(self.signal_path(signal)),
            );
            return Ok(false);
        }
        let node = self.signals.node_mut(signal)?;
        node.owner = Some(owner);
        node.decl = Some(decl);
        node.index = index;
        node.descriptor.take();
        self.components[owner].signals.push(signal);
        Ok(true)
    }

    fn is_ancestor(&self, candidate: ComponentId, of: ComponentId) -> bool {
        let mut cursor = self.components.try_get(of).and_then(|n| n.parent);
        while let Some(id) = cursor {
            if id == candidate {
                return true;
            }
            cursor = self.components.try_get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Declares a port on a component.
    pub fn declare_port(
        &mut self,
        owner: ComponentId,
        name: &str,
        direction: PortDirection,
        width: Option<u32>,
    ) -> Result<PortId, SimError> {
        self.require_phase(&[Phase::Construction], "declare port")?;
        self.component_node(owner)?;
        let id = self.ports.alloc(PortNode {
            name: name.to_string(),
            direction,
            width,
            signal: None,
        });
        self.components[owner].ports.push(id);
        Ok(id)
    }

    /// Binds a port to a signal. Binding again replaces the earlier signal.
    pub fn bind_port<T: SignalValue>(&mut self, port: PortId, signal: &SignalRef<T>) -> Result<(), SimError> {
        self.require_phase(&[Phase::Construction], "bind port")?;
        self.signals.initial(signal)?;
        let node = self.port_node_mut(port)?;
        node.signal = Some(signal.id());
        Ok(())
    }

    /// The signal bound to a port, typed. `Ok(None)` when unbound.
    pub fn port_signal<T: SignalValue>(&self, port: PortId) -> Result<Option<SignalRef<T>>, SimError> {
        let Some(id) = self.port_node(port)?.signal else {
            return Ok(None);
        };
        let signal = SignalRef::new(id);
        self.signals.initial(&signal)?;
        Ok(Some(signal))
    }

    /// Checks every port of `owner`: unbound ports and width mismatches are
    /// reported as error issues. Returns the number of problems.
    pub fn validate_ports(&mut self, owner: ComponentId) -> Result<usize, SimError> {
        let path = self.component_path(owner);
        let mut problems = Vec::new();
        for port in &self.component_node(owner)?.ports {
            let node = self.port_node(*port)?;
            match node.signal {
                None => problems.push(Issue::error(
                    IssueCode::UNBOUND_PORT,
                    format!("port `{}` is unbound", node.name),
                )),
                Some(signal) => {
                    let actual = self.signals.node(signal)?.cell.width();
                    if let (Some(expected), Some(actual)) = (node.width, actual) {
                        if expected != actual {
                            problems.push(
                                Issue::error(
                                    IssueCode::PORT_WIDTH_MISMATCH,
                                    format!(
                                        "port `{}` expects {expected} bits, bound signal has {actual}",
                                        node.name
                                    ),
                                )
                                .with_note(format!("bound to {}", self.signal_path(signal))),
                            );
                        }
                    }
                }
            }
        }
        let count = problems.len();
        for issue in problems {
            self.report(issue.with_path(path.clone()));
        }
        Ok(count)
    }

    fn port_node(&self, port: PortId) -> Result<&PortNode, SimError> {
        self.ports.try_get(port).ok_or(SimError::UnknownObject {
            kind: "port",
            index: port.as_raw(),
        })
    }

    fn port_node_mut(&mut self, port: PortId) -> Result<&mut PortNode, SimError> {
        self.ports.try_get_mut(port).ok_or(SimError::UnknownObject {
            kind: "port",
            index: port.as_raw(),
        })
    }

    pub(crate) fn roots(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Components in depth-first pre-order, roots in creation order.
    pub(crate) fn preorder(&self) -> Vec<ComponentId> {
        let mut order = Vec::with_capacity(self.components.len());
        let mut stack: Vec<ComponentId> = self.roots().collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.components[id].children.iter().rev());
        }
        order
    }

    pub(crate) fn invoke_component(&mut self, id: ComponentId, hook: ComponentHook) -> Result<(), SimError> {
        let Some(mut behavior) = self.components.try_get_mut(id).and_then(|n| n.behavior.take()) else {
            return Ok(());
        };
        let result = match hook {
            ComponentHook::Analyze => behavior.analyze(self, id),
            ComponentHook::PreInitialize => behavior.pre_initialize(self, id),
            ComponentHook::Initialize => behavior.initialize(self, id),
            ComponentHook::PostInitialize => behavior.post_initialize(self, id),
            ComponentHook::Stopped => behavior.on_stopped(self, id),
        };
        self.components[id].behavior = Some(behavior);
        result
    }

    /// Dotted hierarchical path of a component, e.g. `top.rams[1]`.
    pub fn component_path(&self, id: ComponentId) -> String {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor.and_then(|c| self.components.try_get(c)) {
            segments.push(format!("{}{}", self.names.resolve(node.name), node.index));
            cursor = node.parent;
        }
        segments.reverse();
        segments.join(".")
    }

    /// Dotted hierarchical path of a signal.
    pub fn signal_path(&self, id: SignalId) -> String {
        match self.signals.node(id) {
            Ok(node) => self.child_path(node.owner, &format!("{}{}", self.names.resolve(node.name), node.index)),
            Err(_) => id.to_string(),
        }
    }

    /// Dotted hierarchical path of a process.
    pub fn process_path(&self, id: ProcessId) -> String {
        match self.processes.try_get(id) {
            Some(node) => self.child_path(node.owner, self.names.resolve(node.name)),
            None => id.to_string(),
        }
    }

    fn child_path(&self, owner: Option<ComponentId>, local: &str) -> String {
        match owner {
            Some(owner) => format!("{}.{local}", self.component_path(owner)),
            None => local.to_string(),
        }
    }

    /// The signal's descriptor, built on first request and cached until the
    /// signal's path or initial value changes.
    pub fn signal_descriptor(&self, id: SignalId) -> Result<&SignalDescriptor, SimError> {
        let node = self.signals.node(id)?;
        Ok(node.descriptor.get_or_init(|| self.build_signal_descriptor(id, node)))
    }

    fn build_signal_descriptor(&self, id: SignalId, node: &SignalNode) -> SignalDescriptor {
        SignalDescriptor {
            id,
            name: self.names.resolve(node.name).to_string(),
            path: self.signal_path(id),
            type_name: node.cell.type_name().to_string(),
            width: node.cell.width(),
            initial: node.cell.render_initial(),
            resolved: node.cell.is_resolved(),
            owner: node.owner,
        }
    }

    /// Snapshot of the whole design for code generators.
    pub fn describe(&self) -> Result<DesignDescriptor, SimError> {
        let components = self
            .components
            .iter()
            .map(|(id, node)| {
                let ports = node
                    .ports
                    .iter()
                    .map(|p| {
                        let port = self.port_node(*p)?;
                        Ok(PortDescriptor {
                            name: port.name.clone(),
                            direction: port.direction,
                            width: port.width,
                            signal: port.signal,
                        })
                    })
                    .collect::<Result<Vec<_>, SimError>>()?;
                Ok(ComponentDescriptor {
                    id,
                    name: self.names.resolve(node.name).to_string(),
                    path: self.component_path(id),
                    type_name: node.type_name.to_string(),
                    parent: node.parent,
                    decl: node.decl.clone(),
                    index: node.index.clone(),
                    ports,
                    signals: node.signals.clone(),
                    children: node.children.clone(),
                    processes: node.processes.clone(),
                })
            })
            .collect::<Result<Vec<_>, SimError>>()?;
        let signals = self
            .signals
            .nodes
            .ids()
            .map(|id| self.signal_descriptor(id).cloned())
            .collect::<Result<Vec<_>, SimError>>()?;
        let processes = self
            .processes
            .iter()
            .map(|(id, node)| ProcessDescriptor {
                id,
                name: self.names.resolve(node.name).to_string(),
                kind: node.kind,
                clocked: node.predicate.is_some(),
                sensitivity: node.declared.iter().map(|e| self.events.describe(*e)).collect(),
                owner: node.owner,
            })
            .collect();
        Ok(DesignDescriptor {
            components,
            signals,
            processes,
        })
    }
}

//! Structural descriptors handed to code generators.
//!
//! After elaboration the kernel freezes its component tree into a
//! [`DesignDescriptor`]: one record per component, signal and process, linked
//! by ID. Generators walk it to emit HDL or SystemC text; the kernel itself
//! never emits text. Descriptors are plain data and serialize with serde.

use crate::ids::{ComponentId, EventId, ProcessId, SignalId};
use serde::{Deserialize, Serialize};
use std::fmt;
use sysdom_common::ContentHash;

/// Where an object was declared: the owner's path and the field it sits in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclSite {
    /// Hierarchical path of the declaring component.
    pub owner: String,
    /// Field or slot name inside the owner.
    pub field: String,
}

impl DeclSite {
    /// Creates a declaration site.
    pub fn new(owner: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for DeclSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.field)
    }
}

/// Position of an object inside an array-like slot, outermost index first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Indices.
    pub indices: Vec<u32>,
}

impl IndexSpec {
    /// A one-dimensional position.
    pub fn single(index: u32) -> Self {
        Self {
            indices: vec![index],
        }
    }

    /// True when the object is not in an array slot.
    pub fn is_scalar(&self) -> bool {
        self.indices.is_empty()
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.indices.iter().try_for_each(|i| write!(f, "[{i}]"))
    }
}

/// Port direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Read by the component.
    In,
    /// Driven by the component.
    Out,
    /// Both.
    InOut,
}

/// A declared port and the signal bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Port name.
    pub name: String,
    /// Direction.
    pub direction: PortDirection,
    /// Expected bit width, if the port is a bus.
    pub width: Option<u32>,
    /// Bound signal, `None` if left unbound.
    pub signal: Option<SignalId>,
}

/// A signal as seen by generators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDescriptor {
    /// ID.
    pub id: SignalId,
    /// Local name.
    pub name: String,
    /// Hierarchical path.
    pub path: String,
    /// Rust type name of the carried value.
    pub type_name: String,
    /// Bit width for bus values.
    pub width: Option<u32>,
    /// Rendered initial value.
    pub initial: String,
    /// Whether the signal resolves multiple drivers.
    pub resolved: bool,
    /// Owning component.
    pub owner: Option<ComponentId>,
}

/// Process flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessKind {
    /// Runs to completion on every wake-up.
    Triggered,
    /// Resumable state machine, re-entered at its last suspension point.
    Threaded,
}

/// One entry of a process's static sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensitivityDescriptor {
    /// Any value change of a signal.
    Signal(SignalId),
    /// Rising edge of a single-bit signal.
    RisingEdge(SignalId),
    /// Falling edge of a single-bit signal.
    FallingEdge(SignalId),
    /// An event with no signal behind it.
    Event(EventId),
}

/// A registered process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    /// ID.
    pub id: ProcessId,
    /// Local name.
    pub name: String,
    /// Flavor.
    pub kind: ProcessKind,
    /// Whether the process carries a predicate (clocked process).
    pub clocked: bool,
    /// Static sensitivity.
    pub sensitivity: Vec<SensitivityDescriptor>,
    /// Owning component.
    pub owner: Option<ComponentId>,
}

/// A component instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// ID.
    pub id: ComponentId,
    /// Local name.
    pub name: String,
    /// Hierarchical path.
    pub path: String,
    /// Rust type name of the behavior object.
    pub type_name: String,
    /// Parent component.
    pub parent: Option<ComponentId>,
    /// Declaration site inside the parent.
    pub decl: Option<DeclSite>,
    /// Position inside an array slot.
    pub index: IndexSpec,
    /// Declared ports.
    pub ports: Vec<PortDescriptor>,
    /// Owned signals.
    pub signals: Vec<SignalId>,
    /// Child components.
    pub children: Vec<ComponentId>,
    /// Processes registered on behalf of this component.
    pub processes: Vec<ProcessId>,
}

/// Snapshot of the whole elaborated design.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignDescriptor {
    /// Components, indexed by `ComponentId`.
    pub components: Vec<ComponentDescriptor>,
    /// Signals, indexed by `SignalId`.
    pub signals: Vec<SignalDescriptor>,
    /// Processes, indexed by `ProcessId`.
    pub processes: Vec<ProcessDescriptor>,
}

impl DesignDescriptor {
    /// Components without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.components.iter().filter(|c| c.parent.is_none())
    }

    /// Looks up a component.
    pub fn component(&self, id: ComponentId) -> Option<&ComponentDescriptor> {
        self.components.get(id.as_raw() as usize)
    }

    /// Looks up a signal.
    pub fn signal(&self, id: SignalId) -> Option<&SignalDescriptor> {
        self.signals.get(id.as_raw() as usize)
    }

    /// Looks up a process.
    pub fn process(&self, id: ProcessId) -> Option<&ProcessDescriptor> {
        self.processes.get(id.as_raw() as usize)
    }

    /// Finds a component by hierarchical path.
    pub fn find_component(&self, path: &str) -> Option<&ComponentDescriptor> {
        self.components.iter().find(|c| c.path == path)
    }

    /// Finds a signal by hierarchical path.
    pub fn find_signal(&self, path: &str) -> Option<&SignalDescriptor> {
        self.signals.iter().find(|s| s.path == path)
    }

    /// Depth-first pre-order walk over the component tree.
    pub fn walk(&self, mut visit: impl FnMut(usize, &ComponentDescriptor)) {
        let mut stack: Vec<(usize, ComponentId)> =
            self.roots().map(|c| (0, c.id)).collect::<Vec<_>>();
        stack.reverse();
        while let Some((depth, id)) = stack.pop() {
            let Some(component) = self.component(id) else {
                continue;
            };
            visit(depth, component);
            stack.extend(component.children.iter().rev().map(|c| (depth + 1, *c)));
        }
    }

    /// Fingerprint of the serialized structure.
    pub fn fingerprint(&self) -> Result<ContentHash, bincode::error::EncodeError> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        Ok(ContentHash::from_bytes(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(id: u32, name: &str, parent: Option<u32>, children: &[u32]) -> ComponentDescriptor {
        ComponentDescriptor {
            id: ComponentId::from_raw(id),
            name: name.to_string(),
            path: name.to_string(),
            type_name: "Test".to_string(),
            parent: parent.map(ComponentId::from_raw),
            decl: None,
            index: IndexSpec::default(),
            ports: Vec::new(),
            signals: Vec::new(),
            children: children.iter().copied().map(ComponentId::from_raw).collect(),
            processes: Vec::new(),
        }
    }

    fn tree() -> DesignDescriptor {
        DesignDescriptor {
            components: vec![
                component(0, "top", None, &[1, 3]),
                component(1, "top.a", Some(0), &[2]),
                component(2, "top.a.x", Some(1), &[]),
                component(3, "top.b", Some(0), &[]),
            ],
            signals: Vec::new(),
            processes: Vec::new(),
        }
    }

    #[test]
    fn walk_is_preorder() {
        let mut seen = Vec::new();
        tree().walk(|depth, c| seen.push((depth, c.name.clone())));
        assert_eq!(
            seen,
            vec![
                (0, "top".to_string()),
                (1, "top.a".to_string()),
                (2, "top.a.x".to_string()),
                (1, "top.b".to_string()),
            ]
        );
    }

    #[test]
    fn lookups() {
        let design = tree();
        assert_eq!(design.roots().count(), 1);
        assert_eq!(design.find_component("top.b").map(|c| c.id.as_raw()), Some(3));
        assert!(design.component(ComponentId::from_raw(9)).is_none());
        assert!(design.find_signal("top.clk").is_none());
    }

    #[test]
    fn fingerprint_tracks_structure() {
        let a = tree();
        let mut b = tree();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.components[3].name = "top.c".to_string();
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn index_spec_and_decl_display() {
        assert_eq!(IndexSpec::single(2).to_string(), "[2]");
        assert!(IndexSpec::default().is_scalar());
        assert_eq!(DeclSite::new("top", "ram").to_string(), "top.ram");
    }

    #[test]
    fn json_roundtrip() {
        let design = tree();
        let json = serde_json::to_string(&design).unwrap();
        let back: DesignDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, design);
    }
}

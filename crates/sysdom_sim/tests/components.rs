//! Component tree, lifecycle ordering, phase rules and descriptors.

use std::cell::RefCell;
use std::rc::Rc;

use sysdom_common::{Logic, LogicVec, Time};
use sysdom_diagnostics::IssueCode;
use sysdom_ir::{ComponentId, IndexSpec, PortDirection, ProcessKind, SensitivityDescriptor};
use sysdom_sim::components::Clock;
use sysdom_sim::{Component, ComponentCollection, Kernel, Lifecycle, Phase, SignalRef, SimError};

type Log = Rc<RefCell<Vec<String>>>;

struct Recorder {
    name: &'static str,
    log: Log,
}

impl Recorder {
    fn note(&self, hook: &str) {
        self.log.borrow_mut().push(format!("{}:{hook}", self.name));
    }
}

impl Component for Recorder {
    fn analyze(&mut self, _k: &mut Kernel, _me: ComponentId) -> Result<(), SimError> {
        self.note("analyze");
        Ok(())
    }

    fn pre_initialize(&mut self, _k: &mut Kernel, _me: ComponentId) -> Result<(), SimError> {
        self.note("pre");
        Ok(())
    }

    fn initialize(&mut self, _k: &mut Kernel, _me: ComponentId) -> Result<(), SimError> {
        self.note("init");
        Ok(())
    }

    fn post_initialize(&mut self, _k: &mut Kernel, _me: ComponentId) -> Result<(), SimError> {
        self.note("post");
        Ok(())
    }

    fn on_stopped(&mut self, _k: &mut Kernel, _me: ComponentId) -> Result<(), SimError> {
        self.note("stopped");
        Ok(())
    }
}

#[test]
fn lifecycle_runs_each_hook_once_in_order() {
    let log: Log = Rc::default();
    let mut k = Kernel::default();
    let top = k
        .add_component("top", Recorder { name: "top", log: Rc::clone(&log) })
        .unwrap();
    let child = k
        .add_component("child", Recorder { name: "child", log: Rc::clone(&log) })
        .unwrap();
    k.set_owner(child, top, "child", IndexSpec::default()).unwrap();
    for stage in [
        Lifecycle::EndOfConstruction,
        Lifecycle::Analysis,
        Lifecycle::Elaborate,
        Lifecycle::EndOfElaboration,
        Lifecycle::SimulationStopped,
    ] {
        let log = Rc::clone(&log);
        k.on(stage, move |_| {
            log.borrow_mut().push(format!("handler:{stage}"));
            Ok(())
        })
        .unwrap();
    }
    k.elaborate().unwrap();
    k.run().unwrap();
    k.stop().unwrap();
    k.stop().unwrap();

    let log = log.borrow();
    let position = |entry: &str| {
        log.iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("missing {entry} in {log:?}"))
    };
    for who in ["top", "child"] {
        let analyze = position(&format!("{who}:analyze"));
        let pre = position(&format!("{who}:pre"));
        let init = position(&format!("{who}:init"));
        let post = position(&format!("{who}:post"));
        let stopped = position(&format!("{who}:stopped"));
        assert!(analyze < pre && pre < init && init < post && post < stopped);
    }
    assert!(position("handler:end of construction") < position("top:analyze"));
    assert!(position("top:pre") < position("child:pre"), "pre-initialize walks the tree top-down");
    assert_eq!(log.len(), 15, "every hook ran exactly once: {log:?}");
}

#[test]
fn phase_rules_for_reads_and_writes() {
    let mut k = Kernel::default();
    let s = k.signal("s", 3u8).unwrap();
    assert!(matches!(k.cur(&s), Err(SimError::PhaseViolation { .. })));
    assert!(matches!(k.write(&s, 1), Err(SimError::PhaseViolation { .. })));
    assert_eq!(k.initial(&s).unwrap(), 3);

    let seen = Rc::new(RefCell::new(None));
    let probe = Rc::clone(&seen);
    k.on(Lifecycle::Analysis, move |k| {
        k.write(&s, 9)?;
        *probe.borrow_mut() = Some((k.cur(&s)?, k.pre(&s)?, k.phase()));
        Ok(())
    })
    .unwrap();
    k.elaborate().unwrap();
    assert_eq!(*seen.borrow(), Some((3, 3, Phase::DesignAnalysis)));
    assert_eq!(k.cur(&s).unwrap(), 3, "writes during analysis are dropped");
    k.run().unwrap();
    assert_eq!(k.cur(&s).unwrap(), 3);
    assert!(matches!(k.elaborate(), Err(SimError::AlreadyElaborated)));
    assert!(matches!(k.signal("late", 0u8), Err(SimError::PhaseViolation { .. })));
}

#[test]
fn set_initial_only_before_simulation() {
    let mut k = Kernel::default();
    let bus = k.signal("bus", LogicVec::zeros(4)).unwrap();
    k.set_initial(&bus, LogicVec::from_u64(5, 4)).unwrap();
    assert!(matches!(
        k.set_initial(&bus, LogicVec::zeros(3)),
        Err(SimError::WidthMismatch { expected: 4, actual: 3, .. })
    ));
    k.elaborate().unwrap();
    assert_eq!(k.cur(&bus).unwrap().to_u64(), Some(5));
    assert!(k.set_initial(&bus, LogicVec::zeros(4)).is_err());
    assert!(matches!(
        k.write(&bus, LogicVec::zeros(8)),
        Err(SimError::WidthMismatch { .. })
    ));
}

#[test]
fn typed_handles_reject_the_wrong_type() {
    let mut k = Kernel::default();
    let s = k.signal("s", 0u8).unwrap();
    let mem = sysdom_sim::components::DualPortBlockMemory::create(
        &mut k,
        "ram",
        sysdom_sim::components::BlockMemConfig::new(1, 1),
    )
    .unwrap();
    k.bind_port(mem.clk, &s).unwrap();
    assert!(matches!(
        k.port_signal::<Logic>(mem.clk),
        Err(SimError::TypeMismatch { .. })
    ));
}

#[test]
fn double_owner_keeps_first_and_reports() {
    let mut k = Kernel::default();
    let a = add_clock(&mut k, "a");
    let b = add_clock(&mut k, "b");
    let shared = k.signal("shared", 0u16).unwrap();
    assert!(k.set_owner(&shared, a, "x", IndexSpec::default()).unwrap());
    assert!(!k.set_owner(&shared, b, "y", IndexSpec::default()).unwrap());
    let issues = k.issues().issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].code, IssueCode::MULTIPLE_DECLARATION);
    assert!(issues[0].message.contains("a.x") && issues[0].message.contains("b.y"));
    assert_eq!(k.signal_descriptor(shared.id()).unwrap().owner, Some(a));
    assert!(matches!(k.elaborate(), Err(SimError::ElaborationFailed { errors: 1 })));
}

fn add_clock(k: &mut Kernel, name: &str) -> ComponentId {
    let clk: SignalRef<Logic> = k.signal("clk", Logic::Zero).unwrap();
    k.add_component(name, Clock::new(clk, Time::ns(2))).unwrap()
}

#[test]
fn halt_on_error_can_be_disabled() {
    let mut k = Kernel::new(sysdom_sim::SimConfig {
        halt_on_error: false,
        ..Default::default()
    });
    let a = add_clock(&mut k, "a");
    let b = add_clock(&mut k, "b");
    let c = add_clock(&mut k, "c");
    k.set_owner(c, a, "c", IndexSpec::default()).unwrap();
    k.set_owner(c, b, "c", IndexSpec::default()).unwrap();
    k.elaborate().unwrap();
    assert_eq!(k.phase(), Phase::Simulation);
    assert_eq!(k.component_path(c), "a.c");
}

#[test]
fn descriptor_snapshot_of_a_small_design() {
    let mut k = Kernel::default();
    let (clock, clk) = Clock::create(&mut k, "clock", Time::ns(10)).unwrap();
    let top = k
        .add_component("top", Recorder { name: "top", log: Rc::default() })
        .unwrap();
    k.set_owner(clock, top, "clock", IndexSpec::default()).unwrap();
    let lanes: ComponentCollection = (0..2)
        .map(|_| {
            k.add_component("lane", Recorder { name: "lane", log: Rc::default() })
                .unwrap()
        })
        .collect();
    k.set_owner(&lanes, top, "lanes", IndexSpec::default()).unwrap();
    let data = k.signal("data", LogicVec::zeros(8)).unwrap();
    k.set_owner(&data, top, "data", IndexSpec::default()).unwrap();
    let port = k.declare_port(top, "d", PortDirection::In, Some(8)).unwrap();
    k.bind_port(port, &data).unwrap();
    let rising = k.rising_edge(&clk).unwrap();
    let on_data = k.changed(&data).unwrap();
    k.process("sample")
        .owner(top)
        .sensitive_to([rising, on_data])
        .triggered(|_| Ok(()))
        .unwrap();
    k.elaborate().unwrap();

    let design = k.describe().unwrap();
    let top_desc = design.find_component("top").unwrap();
    assert_eq!(top_desc.children.len(), 3);
    assert_eq!(top_desc.ports[0].signal, Some(data.id()));
    assert!(design.find_component("top.clock").is_some());
    assert!(design.find_component("top.lane[1]").is_some());
    assert_eq!(design.find_signal("top.clock.clk").unwrap().width, None);
    assert_eq!(design.find_signal("top.data").unwrap().width, Some(8));

    let sample = design
        .processes
        .iter()
        .find(|p| p.name == "sample")
        .unwrap();
    assert_eq!(sample.kind, ProcessKind::Triggered);
    assert_eq!(
        sample.sensitivity,
        vec![
            SensitivityDescriptor::RisingEdge(clk.id()),
            SensitivityDescriptor::Signal(data.id()),
        ]
    );
    let toggle = design.processes.iter().find(|p| p.name == "toggle").unwrap();
    assert_eq!(toggle.kind, ProcessKind::Threaded);
    assert_eq!(toggle.owner, Some(clock));

    let mut order = Vec::new();
    design.walk(|depth, c| order.push((depth, c.path.clone())));
    assert_eq!(order[0], (0, "top".to_string()));
    assert_eq!(order.len(), 4);

    let json = serde_json::to_string(&design).unwrap();
    assert!(json.contains("top.lane[0]"));
    assert_eq!(
        design.fingerprint().unwrap(),
        k.describe().unwrap().fingerprint().unwrap()
    );
}

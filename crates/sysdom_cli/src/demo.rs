//! Bundled demo designs.

use sysdom_common::{Logic, LogicVec, Time};
use sysdom_diagnostics::{Issue, IssueCode};
use sysdom_ir::{ComponentId, EventId, IndexSpec};
use sysdom_sim::components::{BlockMemConfig, BlockMemHandle, Clock, DualPortBlockMemory, MemoryPortPins};
use sysdom_sim::derived;
use sysdom_sim::{Component, Kernel, ProcessContext, SignalRef, SimError, Step, Thread, Wait};

use crate::Demo;

const COUNTER_WIDTH: u32 = 8;

/// Builds `demo` on `kernel` and returns how long it runs when no time
/// limit is configured.
pub fn build(demo: Demo, kernel: &mut Kernel) -> Result<Time, SimError> {
    match demo {
        Demo::Counter => counter(kernel).map(|(duration, _)| duration),
        Demo::Memory => build_memory(kernel),
    }
}

/// Container component for the demo's parts.
struct Top;

impl Component for Top {}

/// The counter design; also returns the count signal.
fn counter(kernel: &mut Kernel) -> Result<(Time, SignalRef<LogicVec>), SimError> {
    let top = kernel.add_component("top", Top)?;
    let (clock, clk) = Clock::create(kernel, "clock", Time::ns(10))?;
    kernel.set_owner(clock, top, "clock", IndexSpec::default())?;

    let count = kernel.signal("count", LogicVec::zeros(COUNTER_WIDTH))?;
    kernel.set_owner(&count, top, "count", IndexSpec::default())?;
    let rising = kernel.rising_edge(&clk)?;
    kernel
        .process("increment")
        .owner(top)
        .sensitive_to([rising])
        .predicate(move |s| Ok(s.cur(&clk)? == Logic::One))
        .triggered(move |ctx| {
            let next = ctx.cur(&count)?.to_u64().map_or(0, |v| v + 1);
            ctx.write(&count, LogicVec::from_u64(next, COUNTER_WIDTH))
        })?;

    let msb = derived::map(&count, |v: LogicVec| v.get(COUNTER_WIDTH - 1));
    let on_msb = msb.changed_events(kernel)?;
    kernel
        .process("msb_watch")
        .owner(top)
        .sensitive_to(on_msb)
        .triggered(move |ctx| {
            if msb.cur(ctx.signals())? == Logic::One && msb.pre(ctx.signals())? != Logic::One {
                ctx.info("counter reached the upper half");
            }
            Ok(())
        })?;
    Ok((Time::ns(3_000), count))
}

fn build_memory(kernel: &mut Kernel) -> Result<Time, SimError> {
    let top = kernel.add_component("top", Top)?;
    let (clock, clk) = Clock::create(kernel, "clock", Time::ns(10))?;
    kernel.set_owner(clock, top, "clock", IndexSpec::default())?;
    let config = BlockMemConfig::new(4, 8);
    let mem = DualPortBlockMemory::create(kernel, "ram", config)?;
    kernel.set_owner(mem.component, top, "ram", IndexSpec::default())?;
    kernel.bind_port(mem.clk, &clk)?;

    let a = Pins::create(kernel, top, &mem.a, "a", &config)?;
    let b = Pins::create(kernel, top, &mem.b, "b", &config)?;
    let falling = kernel.falling_edge(&clk)?;
    kernel.process("stimulus").owner(top).threaded(Stimulus {
        step: 0,
        falling,
        a,
        b,
        mem,
    })?;
    Ok(Time::ns(100))
}

/// Testbench-side signals of one memory port.
#[derive(Clone, Copy)]
struct Pins {
    en: SignalRef<Logic>,
    we: SignalRef<Logic>,
    addr: SignalRef<LogicVec>,
    din: SignalRef<LogicVec>,
    dout: SignalRef<LogicVec>,
}

impl Pins {
    fn create(
        kernel: &mut Kernel,
        owner: ComponentId,
        pins: &MemoryPortPins,
        side: &str,
        config: &BlockMemConfig,
    ) -> Result<Self, SimError> {
        let this = Self {
            en: kernel.signal(&format!("en_{side}"), Logic::Zero)?,
            we: kernel.signal(&format!("we_{side}"), Logic::Zero)?,
            addr: kernel.signal(&format!("addr_{side}"), LogicVec::zeros(config.addr_width))?,
            din: kernel.signal(&format!("din_{side}"), LogicVec::zeros(config.data_width))?,
            dout: kernel.signal(&format!("dout_{side}"), LogicVec::zeros(config.data_width))?,
        };
        for (signal, name) in [(&this.en, "en"), (&this.we, "we")] {
            kernel.set_owner(signal, owner, &format!("{name}_{side}"), IndexSpec::default())?;
        }
        for (signal, name) in [(&this.addr, "addr"), (&this.din, "din"), (&this.dout, "dout")] {
            kernel.set_owner(signal, owner, &format!("{name}_{side}"), IndexSpec::default())?;
        }
        kernel.bind_port(pins.en, &this.en)?;
        kernel.bind_port(pins.we, &this.we)?;
        kernel.bind_port(pins.addr, &this.addr)?;
        kernel.bind_port(pins.din, &this.din)?;
        kernel.bind_port(pins.dout, &this.dout)?;
        Ok(this)
    }

    fn drive(&self, ctx: &mut ProcessContext<'_>, en: bool, we: bool, addr: &str, din: u64) -> Result<(), SimError> {
        let width = ctx.cur(&self.din)?.width();
        let addr = LogicVec::from_binary_str(addr).ok_or_else(|| ctx.fail(format!("bad address literal {addr}")))?;
        ctx.write(&self.en, Logic::from_bool(en))?;
        ctx.write(&self.we, Logic::from_bool(we))?;
        ctx.write(&self.addr, addr)?;
        ctx.write(&self.din, LogicVec::from_u64(din, width))
    }
}

/// Drives both ports on falling edges so the memory samples stable inputs
/// on the following rising edge.
struct Stimulus {
    step: u32,
    falling: EventId,
    a: Pins,
    b: Pins,
    mem: BlockMemHandle,
}

impl Thread for Stimulus {
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Step, SimError> {
        let (a, b) = (self.a, self.b);
        match self.step {
            // write 0xA5 to word 1 through port A
            0 => {
                a.drive(ctx, true, true, "0001", 0xa5)?;
                b.drive(ctx, false, false, "0000", 0)?;
            }
            // read it back through port B
            1 => {
                a.drive(ctx, false, false, "0000", 0)?;
                b.drive(ctx, true, false, "0001", 0)?;
            }
            // port A writes word 2 while port B reads it
            2 => {
                let read = ctx.cur(&b.dout)?;
                ctx.info(format!("port b read {read}"));
                a.drive(ctx, true, true, "0010", 0x3c)?;
                b.drive(ctx, true, false, "0010", 0)?;
            }
            // write through an address with an unknown bit
            3 => {
                a.drive(ctx, true, true, "00X1", 0xff)?;
                b.drive(ctx, false, false, "0000", 0)?;
            }
            _ => {
                a.drive(ctx, false, false, "0000", 0)?;
                let image = ctx.cur(&self.mem.memory)?;
                let corrupted = image.iter().filter(|w| w.has_unknown()).count();
                ctx.report(Issue::info(
                    IssueCode::USER,
                    format!("{corrupted} of {} words are unknown", image.len()),
                ));
                ctx.stop();
                return Ok(Step::Wait(Wait::Forever));
            }
        }
        self.step += 1;
        Ok(Step::Wait(Wait::Event(self.falling)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysdom_diagnostics::Severity;
    use sysdom_sim::RunOutcome;

    #[test]
    fn counter_counts_clock_edges() {
        let mut k = Kernel::default();
        let (_, count) = counter(&mut k).unwrap();
        k.elaborate().unwrap();
        k.run_until(Time::ns(1_300)).unwrap();
        // rising edges at 5, 15, ..., 1295ns
        assert_eq!(k.cur(&count).unwrap().to_u64(), Some(130));
        let infos = k.issues().with_severity(Severity::Info);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].path.as_deref(), Some("top.msb_watch"));
    }

    #[test]
    fn memory_demo_reports_collision_and_corruption() {
        let mut k = Kernel::default();
        let duration = build(Demo::Memory, &mut k).unwrap();
        k.elaborate().unwrap();
        assert_eq!(k.run_until(duration).unwrap(), RunOutcome::Stopped);
        let codes: Vec<IssueCode> = k
            .issues()
            .with_severity(Severity::Warning)
            .iter()
            .map(|i| i.code)
            .collect();
        assert_eq!(codes, vec![IssueCode::PORT_COLLISION, IssueCode::IMPROPER_ADDRESS]);
        let infos = k.issues().with_severity(Severity::Info);
        assert!(infos[0].message.contains("10100101"));
        assert_eq!(infos[1].message, "16 of 16 words are unknown");
        assert_eq!(k.issues().error_count(), 0);
    }

    #[test]
    fn demos_describe_their_hierarchy() {
        let mut k = Kernel::default();
        build(Demo::Memory, &mut k).unwrap();
        k.elaborate().unwrap();
        let design = k.describe().unwrap();
        assert!(design.find_component("top.ram").is_some());
        assert!(design.find_component("top.clock").is_some());
        assert!(design.find_signal("top.ram.memory").is_some());
        assert!(design.find_signal("top.dout_b").is_some());
    }
}

//! Dual-port synchronous block memory with collision reporting.
//!
//! Both ports share one clock. On each rising edge every enabled port reads
//! the addressed word (read-first: the value before this edge's writes) and,
//! if its write enable is high, stores its input word.
//!
//! Two conditions are reported as warnings and simulation continues:
//!
//! - a write while the other port is enabled at the same address
//!   ([`IssueCode::PORT_COLLISION`]). The word becomes all `X` and a read of
//!   it through the other port returns `X`.
//! - a write through an address with `X`/`Z` bits or outside the memory
//!   ([`IssueCode::IMPROPER_ADDRESS`]). The whole memory becomes `X`.
//!
//! A read through an improper address returns `X` without an issue.

use sysdom_common::{Logic, LogicVec};
use sysdom_diagnostics::{Issue, IssueCode};
use sysdom_ir::{ComponentId, IndexSpec, PortDirection, PortId};
use tracing::warn;

use crate::component::Component;
use crate::context::ProcessContext;
use crate::error::SimError;
use crate::kernel::Kernel;
use crate::signal::SignalRef;

/// Widest supported address bus. The image is allocated up front, one word
/// per address.
pub const MAX_ADDR_WIDTH: u32 = 24;

/// Memory geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMemConfig {
    /// Number of words.
    pub depth: u32,
    /// Width of the address buses.
    pub addr_width: u32,
    /// Width of a word.
    pub data_width: u32,
}

impl BlockMemConfig {
    /// A memory with `2^addr_width` words.
    pub fn new(addr_width: u32, data_width: u32) -> Self {
        Self {
            depth: 1u32.checked_shl(addr_width).unwrap_or(u32::MAX),
            addr_width,
            data_width,
        }
    }

    fn check(&self, name: &str) -> Result<(), SimError> {
        let reason = if self.addr_width == 0 || self.addr_width > MAX_ADDR_WIDTH {
            format!("address width {} is outside 1..={MAX_ADDR_WIDTH}", self.addr_width)
        } else if self.depth == 0 || u64::from(self.depth) > 1u64 << self.addr_width {
            format!("depth {} does not fit a {}-bit address", self.depth, self.addr_width)
        } else if self.data_width == 0 {
            "data width must be nonzero".to_string()
        } else {
            return Ok(());
        };
        Err(SimError::InvalidParameters {
            component: name.to_string(),
            reason,
        })
    }
}

/// Port handles of one memory port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryPortPins {
    /// Port enable, `Logic`.
    pub en: PortId,
    /// Write enable, `Logic`.
    pub we: PortId,
    /// Address, `LogicVec` of `addr_width` bits.
    pub addr: PortId,
    /// Write data, `LogicVec` of `data_width` bits.
    pub din: PortId,
    /// Read data, `LogicVec` of `data_width` bits.
    pub dout: PortId,
}

/// Everything needed to wire up a memory created by
/// [`DualPortBlockMemory::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMemHandle {
    /// The component.
    pub component: ComponentId,
    /// Shared clock port, `Logic`.
    pub clk: PortId,
    /// Port A.
    pub a: MemoryPortPins,
    /// Port B.
    pub b: MemoryPortPins,
    /// The memory image, one word per entry. Initially all `X`.
    pub memory: SignalRef<Vec<LogicVec>>,
}

/// The memory component. See the module documentation for its behavior.
#[derive(Debug)]
pub struct DualPortBlockMemory {
    config: BlockMemConfig,
    handle: Option<BlockMemHandle>,
}

impl DualPortBlockMemory {
    /// Adds a memory component, declares its ports and creates its image
    /// signal. Bind every port before elaboration.
    pub fn create(kernel: &mut Kernel, name: &str, config: BlockMemConfig) -> Result<BlockMemHandle, SimError> {
        config.check(name)?;
        let component = kernel.add_component(
            name,
            DualPortBlockMemory {
                config,
                handle: None,
            },
        )?;
        let clk = kernel.declare_port(component, "clk", PortDirection::In, None)?;
        let a = declare_pins(kernel, component, "a", &config)?;
        let b = declare_pins(kernel, component, "b", &config)?;
        let image = vec![LogicVec::unknown(config.data_width); config.depth as usize];
        let memory = kernel.signal("memory", image)?;
        kernel.set_owner(&memory, component, "memory", IndexSpec::default())?;
        let handle = BlockMemHandle {
            component,
            clk,
            a,
            b,
            memory,
        };
        if let Some(mem) = kernel.component_mut::<DualPortBlockMemory>(component) {
            mem.handle = Some(handle);
        }
        Ok(handle)
    }

    /// The configured geometry.
    pub fn config(&self) -> BlockMemConfig {
        self.config
    }
}

fn declare_pins(
    kernel: &mut Kernel,
    owner: ComponentId,
    side: &str,
    config: &BlockMemConfig,
) -> Result<MemoryPortPins, SimError> {
    Ok(MemoryPortPins {
        en: kernel.declare_port(owner, &format!("en_{side}"), PortDirection::In, None)?,
        we: kernel.declare_port(owner, &format!("we_{side}"), PortDirection::In, None)?,
        addr: kernel.declare_port(
            owner,
            &format!("addr_{side}"),
            PortDirection::In,
            Some(config.addr_width),
        )?,
        din: kernel.declare_port(
            owner,
            &format!("din_{side}"),
            PortDirection::In,
            Some(config.data_width),
        )?,
        dout: kernel.declare_port(
            owner,
            &format!("dout_{side}"),
            PortDirection::Out,
            Some(config.data_width),
        )?,
    })
}

impl Component for DualPortBlockMemory {
    fn initialize(&mut self, kernel: &mut Kernel, me: ComponentId) -> Result<(), SimError> {
        let Some(handle) = self.handle else {
            return Ok(());
        };
        if kernel.validate_ports(me)? > 0 {
            warn!(memory = %kernel.component_path(me), "port binding incomplete, memory stays inactive");
            return Ok(());
        }
        let clk: SignalRef<Logic> = bound(kernel, handle.clk)?;
        let a = PortSignals::bind(kernel, &handle.a)?;
        let b = PortSignals::bind(kernel, &handle.b)?;
        let rising = kernel.rising_edge(&clk)?;
        let memory = handle.memory;
        let config = self.config;
        kernel
            .process("access")
            .owner(me)
            .sensitive_to([rising])
            .predicate(move |s| Ok(s.cur(&clk)? == Logic::One))
            .triggered(move |ctx| access(ctx, &memory, [&a, &b], &config))?;
        Ok(())
    }
}

fn bound<T: crate::value::SignalValue>(kernel: &Kernel, port: PortId) -> Result<SignalRef<T>, SimError> {
    kernel.port_signal(port)?.ok_or(SimError::UnknownObject {
        kind: "port binding",
        index: port.as_raw(),
    })
}

#[derive(Clone, Copy)]
struct PortSignals {
    en: SignalRef<Logic>,
    we: SignalRef<Logic>,
    addr: SignalRef<LogicVec>,
    din: SignalRef<LogicVec>,
    dout: SignalRef<LogicVec>,
}

impl PortSignals {
    fn bind(kernel: &Kernel, pins: &MemoryPortPins) -> Result<Self, SimError> {
        Ok(Self {
            en: bound(kernel, pins.en)?,
            we: bound(kernel, pins.we)?,
            addr: bound(kernel, pins.addr)?,
            din: bound(kernel, pins.din)?,
            dout: bound(kernel, pins.dout)?,
        })
    }
}

struct PortSample {
    enabled: bool,
    write: bool,
    /// `None` for addresses with unknown bits or past the last word.
    addr: Option<usize>,
    din: LogicVec,
}

impl PortSample {
    fn read(ctx: &ProcessContext<'_>, port: &PortSignals, depth: usize) -> Result<Self, SimError> {
        let addr = ctx
            .cur(&port.addr)?
            .to_u64()
            .map(|a| a as usize)
            .filter(|a| *a < depth);
        Ok(Self {
            enabled: ctx.cur(&port.en)? == Logic::One,
            write: ctx.cur(&port.we)? == Logic::One,
            addr,
            din: ctx.cur(&port.din)?,
        })
    }

    fn writes(&self) -> bool {
        self.enabled && self.write
    }
}

fn access(
    ctx: &mut ProcessContext<'_>,
    memory: &SignalRef<Vec<LogicVec>>,
    ports: [&PortSignals; 2],
    config: &BlockMemConfig,
) -> Result<(), SimError> {
    let image = ctx.cur(memory)?;
    let samples = [
        PortSample::read(ctx, ports[0], image.len())?,
        PortSample::read(ctx, ports[1], image.len())?,
    ];
    let unknown = || LogicVec::unknown(config.data_width);

    let collision = match (&samples[0], &samples[1]) {
        (a, b) if a.enabled && b.enabled && (a.write || b.write) => match (a.addr, b.addr) {
            (Some(x), Some(y)) if x == y => Some(x),
            _ => None,
        },
        _ => None,
    };

    for (sample, port) in samples.iter().zip(ports) {
        if !sample.enabled {
            continue;
        }
        let word = match (sample.addr, collision) {
            (Some(addr), Some(hit)) if addr == hit => unknown(),
            (Some(addr), _) => image[addr].clone(),
            (None, _) => unknown(),
        };
        ctx.write(&port.dout, word)?;
    }

    if !samples.iter().any(PortSample::writes) {
        return Ok(());
    }
    let mut next = image;
    if samples.iter().any(|s| s.writes() && s.addr.is_none()) {
        ctx.report(Issue::warning(
            IssueCode::IMPROPER_ADDRESS,
            "improper address, will corrupt memory",
        ));
        next.iter_mut().for_each(|w| *w = unknown());
        return ctx.write(memory, next);
    }
    for sample in samples.iter().filter(|s| s.writes()) {
        if let Some(addr) = sample.addr {
            next[addr] = sample.din.clone();
        }
    }
    if let Some(addr) = collision {
        ctx.report(Issue::warning(
            IssueCode::PORT_COLLISION,
            format!("collision detected (address = 0x{addr:X})"),
        ));
        next[addr] = unknown();
    }
    ctx.write(memory, next)
}

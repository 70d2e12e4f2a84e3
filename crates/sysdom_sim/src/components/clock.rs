//! Free-running clock generator.

use sysdom_common::{Logic, Time};
use sysdom_ir::{ComponentId, IndexSpec};

use crate::component::Component;
use crate::context::ProcessContext;
use crate::error::SimError;
use crate::kernel::Kernel;
use crate::process::{Step, Thread, Wait};
use crate::signal::SignalRef;

/// Drives a `Logic` signal low for `low`, then high for `high`, forever.
///
/// The first rising edge happens at `low`. Half periods shorter than one
/// femtosecond are raised to one femtosecond.
#[derive(Debug, Clone)]
pub struct Clock {
    signal: SignalRef<Logic>,
    low: Time,
    high: Time,
}

impl Clock {
    /// A 50% duty cycle clock on `signal`.
    pub fn new(signal: SignalRef<Logic>, period: Time) -> Self {
        let low = Time::from_fs(period.as_fs() / 2);
        let high = Time::from_fs(period.as_fs() - low.as_fs());
        Self::with_duty(signal, low, high)
    }

    /// A clock with explicit low and high times.
    pub fn with_duty(signal: SignalRef<Logic>, low: Time, high: Time) -> Self {
        Self {
            signal,
            low: Time::from_fs(low.as_fs().max(1)),
            high: Time::from_fs(high.as_fs().max(1)),
        }
    }

    /// Creates the clock component together with the signal it drives,
    /// owned by the component as `clk`.
    pub fn create(
        kernel: &mut Kernel,
        name: &str,
        period: Time,
    ) -> Result<(ComponentId, SignalRef<Logic>), SimError> {
        let signal = kernel.signal("clk", Logic::Zero)?;
        let id = kernel.add_component(name, Clock::new(signal, period))?;
        kernel.set_owner(&signal, id, "clk", IndexSpec::default())?;
        Ok((id, signal))
    }

    /// The driven signal.
    pub fn signal(&self) -> SignalRef<Logic> {
        self.signal
    }

    /// Low time plus high time.
    pub fn period(&self) -> Time {
        Time::from_fs(self.low.as_fs().saturating_add(self.high.as_fs()))
    }
}

impl Component for Clock {
    fn initialize(&mut self, kernel: &mut Kernel, me: ComponentId) -> Result<(), SimError> {
        kernel.process("toggle").owner(me).threaded(Toggle {
            signal: self.signal,
            low: self.low,
            high: self.high,
            level: Logic::Zero,
        })?;
        Ok(())
    }
}

struct Toggle {
    signal: SignalRef<Logic>,
    low: Time,
    high: Time,
    level: Logic,
}

impl Thread for Toggle {
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Step, SimError> {
        let hold = match self.level {
            Logic::One => self.high,
            _ => self.low,
        };
        ctx.write(&self.signal, self.level)?;
        self.level = !self.level;
        Ok(Step::Wait(Wait::For(hold)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_with_half_periods() {
        let mut k = Kernel::default();
        let (_, clk) = Clock::create(&mut k, "clock", Time::ns(10)).unwrap();
        let rising = k.rising_edge(&clk).unwrap();
        let edges = k.triggered_process("count", [rising], |_| Ok(())).unwrap();
        k.elaborate().unwrap();
        k.run_until(Time::ns(4)).unwrap();
        assert_eq!(k.cur(&clk).unwrap(), Logic::Zero);
        k.run_until(Time::ns(7)).unwrap();
        assert_eq!(k.cur(&clk).unwrap(), Logic::One);
        k.run_until(Time::ns(12)).unwrap();
        assert_eq!(k.cur(&clk).unwrap(), Logic::Zero);
        k.run_until(Time::ns(36)).unwrap();
        // initial run at time 0, then edges at 5, 15, 25 and 35ns
        assert_eq!(k.wake_count(edges).unwrap(), 5);
    }

    #[test]
    fn duty_and_period() {
        let mut k = Kernel::default();
        let clk = k.signal("clk", Logic::Zero).unwrap();
        let c = Clock::with_duty(clk, Time::ns(3), Time::ns(1));
        assert_eq!(c.period(), Time::ns(4));
        assert_eq!(Clock::new(clk, Time::from_fs(1)).period(), Time::from_fs(2));
        assert_eq!(c.signal(), clk);
    }
}

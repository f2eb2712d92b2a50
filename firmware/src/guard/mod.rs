//! Firmware binding of the core cycle runner.
//!
//! Converts the core's tick period into embassy time, sizes the independent
//! watchdog against it, and supplies the critical section the state machine
//! update runs under.

use embassy_time::Duration;
use load_guard_core::controller::TICK_PERIOD;

#[cfg(target_os = "none")]
use load_guard_core::orchestrator::{CycleRunner, ExclusiveSection};

#[cfg(target_os = "none")]
use crate::hw::{LoadSwitch, adc::SupplyAdc};

/// Tick periods the watchdog tolerates before resetting the MCU.
pub const WATCHDOG_TICK_BUDGET: u32 = 3;

/// Runner bound to the board peripherals.
#[cfg(target_os = "none")]
pub type FirmwareRunner<'d> = CycleRunner<SupplyAdc<'d>, LoadSwitch<'d>, CriticalSectionGuard>;

/// Runs the classify/step/drive sequence with interrupts masked.
#[cfg(target_os = "none")]
#[derive(Copy, Clone, Debug, Default)]
pub struct CriticalSectionGuard;

#[cfg(target_os = "none")]
impl ExclusiveSection for CriticalSectionGuard {
    fn run<R>(&mut self, f: impl FnOnce() -> R) -> R {
        critical_section::with(|_| f())
    }
}

fn core_duration_to_embassy(duration: core::time::Duration) -> Duration {
    let micros = duration.as_micros();
    let micros = u64::try_from(micros).unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}

/// Interval between wake ticks in embassy time.
pub fn tick_interval() -> Duration {
    core_duration_to_embassy(TICK_PERIOD)
}

/// Independent watchdog timeout, in microseconds.
pub fn watchdog_timeout_us() -> u32 {
    let micros = tick_interval().as_micros().saturating_mul(u64::from(WATCHDOG_TICK_BUDGET));
    u32::try_from(micros).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_interval_matches_core_period() {
        assert_eq!(tick_interval(), Duration::from_secs(4));
    }

    #[test]
    fn watchdog_outlasts_several_ticks() {
        assert_eq!(watchdog_timeout_us(), 12_000_000);
        assert!(u64::from(watchdog_timeout_us()) > tick_interval().as_micros());
    }
}

//! Board bindings for the load guard.
//!
//! Implements the `load-guard-core` hardware traits on top of the embassy
//! STM32 drivers: the supply ADC lives in [`adc`], the load switch here.
//! [`clock`] holds the reduced system clock the board runs from.

pub mod adc;
pub mod clock;

#[cfg(target_os = "none")]
use embassy_stm32::gpio::Output;
#[cfg(target_os = "none")]
use load_guard_core::orchestrator::LoadDriver;

/// Push-pull output driving the load MOSFET gate (high == connected).
#[cfg(target_os = "none")]
pub struct LoadSwitch<'d> {
    output: Output<'d>,
}

#[cfg(target_os = "none")]
impl<'d> LoadSwitch<'d> {
    pub fn new(output: Output<'d>) -> Self {
        Self { output }
    }
}

#[cfg(target_os = "none")]
impl LoadDriver for LoadSwitch<'_> {
    fn set_load(&mut self, on: bool) {
        if on {
            self.output.set_high();
        } else {
            self.output.set_low();
        }
    }
}

//! Supply-voltage sampling for the STM32G0 ADC.
//!
//! The vehicle supply reaches `PA0` through a divider sized so that ADC full
//! scale corresponds to roughly 15 V, matching the raw-unit scaling the core
//! thresholds are expressed in. Conversions run at 8-bit resolution with the
//! longest sample time because the divider has a high source impedance.

use load_guard_core::sampler::RawSample;

#[cfg(target_os = "none")]
use embassy_stm32::adc::{Adc, AdcChannel, AnyAdcChannel, Resolution, SampleTime};
#[cfg(target_os = "none")]
use embassy_stm32::peripherals::ADC1;
#[cfg(target_os = "none")]
use load_guard_core::orchestrator::VoltageSampler;

/// Converts an 8-bit conversion result into a [`RawSample`], saturating wider values.
pub fn raw_from_reading(reading: u16) -> RawSample {
    RawSample::new(u8::try_from(reading).unwrap_or(u8::MAX))
}

/// Embassy ADC wrapper that produces successive supply samples.
#[cfg(target_os = "none")]
pub struct SupplyAdc<'d> {
    adc: Adc<'d, ADC1>,
    channel: AnyAdcChannel<ADC1>,
    discard_next: bool,
}

#[cfg(target_os = "none")]
impl<'d> SupplyAdc<'d> {
    /// Configures the converter for 8-bit supply readings on `channel`.
    pub fn new(mut adc: Adc<'d, ADC1>, channel: impl AdcChannel<ADC1>) -> Self {
        adc.set_sample_time(SampleTime::CYCLES160_5);
        adc.set_resolution(Resolution::BITS8);
        Self {
            adc,
            channel: channel.degrade_adc(),
            discard_next: true,
        }
    }

    fn read_once(&mut self) -> u16 {
        self.adc.blocking_read(&mut self.channel)
    }
}

#[cfg(target_os = "none")]
impl VoltageSampler for SupplyAdc<'_> {
    fn sample(&mut self) -> RawSample {
        // The first conversion after enabling the ADC is unreliable.
        if self.discard_next {
            let _ = self.read_once();
            self.discard_next = false;
        }

        raw_from_reading(self.read_once())
    }
}

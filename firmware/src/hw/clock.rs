//! Reduced system clock for battery operation.
//!
//! The guard does a few microseconds of work every wake tick, so the core runs
//! from the internal 16 MHz oscillator divided down to 1 MHz with the PLL off.
//! The ADC and the TIM1 time driver both run from this clock.

use embassy_time::TICK_HZ;

/// Internal high-speed oscillator frequency.
pub const HSI_HZ: u32 = 16_000_000;

/// Divider applied between HSI and SYSCLK.
pub const HSI_SYS_DIVIDER: u32 = 16;

/// Resulting system clock.
pub const SYSCLK_HZ: u32 = HSI_HZ / HSI_SYS_DIVIDER;

/// Prescaler the time driver needs to reach the embassy tick rate.
#[allow(clippy::cast_lossless, clippy::cast_possible_truncation)]
pub const fn time_driver_prescaler() -> Option<u32> {
    let sysclk = SYSCLK_HZ as u64;
    if sysclk < TICK_HZ || sysclk % TICK_HZ != 0 {
        return None;
    }
    // Bounded by SYSCLK_HZ, which is a u32.
    Some((sysclk / TICK_HZ) as u32)
}

/// RCC configuration for the reduced clock.
#[cfg(target_os = "none")]
pub fn low_power_config() -> embassy_stm32::rcc::Config {
    use embassy_stm32::rcc::{AHBPrescaler, APBPrescaler, Config, Hsi, HsiSysDiv, Sysclk};

    const {
        assert!(HSI_SYS_DIVIDER == 16);
        assert!(time_driver_prescaler().is_some());
    };

    let mut config = Config::default();
    config.hsi = Some(Hsi {
        sys_div: HsiSysDiv::DIV16,
    });
    config.hse = None;
    config.pll = None;
    config.sys = Sysclk::HSI;
    config.ahb_pre = AHBPrescaler::DIV1;
    config.apb1_pre = APBPrescaler::DIV1;
    config
}

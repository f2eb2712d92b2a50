use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::Adc;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::wdg::IndependentWatchdog;

use crate::guard::{CriticalSectionGuard, FirmwareRunner, watchdog_timeout_us};
use crate::hw::{LoadSwitch, adc::SupplyAdc, clock};
use crate::telemetry::TelemetryRecorder;

mod guard_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let mut config = hal::Config::default();
    config.rcc = clock::low_power_config();
    let hal::Peripherals {
        PA0,
        PA1,
        ADC1,
        IWDG,
        ..
    } = hal::init(config);

    // Load defaults on at boot; `boot_guarded` drives it high again regardless.
    let load = LoadSwitch::new(Output::new(PA1, Level::High, Speed::Low));
    let sampler = SupplyAdc::new(Adc::new(ADC1), PA0);
    let runner: FirmwareRunner<'static> =
        FirmwareRunner::boot_guarded(sampler, load, CriticalSectionGuard);

    let watchdog = IndependentWatchdog::new(IWDG, watchdog_timeout_us());
    let telemetry = TelemetryRecorder::new();

    spawner
        .spawn(guard_task::run(runner, watchdog, telemetry))
        .expect("failed to spawn load guard task");

    core::future::pending::<()>().await;
}

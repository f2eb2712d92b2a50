use embassy_stm32::peripherals::IWDG;
use embassy_stm32::wdg::IndependentWatchdog;
use embassy_time::Ticker;

use crate::guard::{FirmwareRunner, tick_interval};
use crate::hw::clock::SYSCLK_HZ;
use crate::telemetry::TelemetryRecorder;

#[embassy_executor::task]
pub async fn run(
    mut runner: FirmwareRunner<'static>,
    mut watchdog: IndependentWatchdog<'static, IWDG>,
    mut telemetry: TelemetryRecorder,
) -> ! {
    let mut ticker = Ticker::every(tick_interval());
    watchdog.unleash();
    defmt::info!(
        "guard: running, sysclk={=u32}Hz tick={}ms state={}",
        SYSCLK_HZ,
        tick_interval().as_millis(),
        runner.state().machine().label()
    );

    loop {
        let report = runner.run_cycle();
        telemetry.observe(&report);
        watchdog.pet();

        // The thread-mode executor parks the core in WFE until the ticker fires.
        ticker.next().await;
    }
}

use core::panic::PanicInfo;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    defmt::error!("guard: panic {}", defmt::Display2Format(info));
    // Trap; the independent watchdog resets the MCU if it is already running.
    cortex_m::asm::udf();
}

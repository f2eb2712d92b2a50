//! Telemetry ring and logging helpers.
//!
//! Wraps the `load-guard-core` recorder so every notable cycle (state change or
//! load switch) lands in the ring and is mirrored to defmt on target or stdout
//! on host builds. Routine cycles are only logged at debug level.

use load_guard_core::orchestrator::CycleReport;
use load_guard_core::telemetry::{
    TelemetryEventKind, TelemetryRecord, TelemetryRecorder as CoreRecorder,
};

/// Records guard telemetry and mirrors it to the log sink.
pub struct TelemetryRecorder {
    inner: CoreRecorder,
}

impl TelemetryRecorder {
    /// Creates a new telemetry recorder with an empty history.
    pub const fn new() -> Self {
        Self {
            inner: CoreRecorder::new(),
        }
    }

    /// Returns the underlying ring.
    pub fn ring(&self) -> &CoreRecorder {
        &self.inner
    }

    /// Records one wake cycle, logging any events it produced.
    pub fn observe(&mut self, report: &CycleReport) -> usize {
        log_cycle(report);

        let written = self.inner.record_cycle(report);
        let skip = self.inner.len().saturating_sub(written);
        for record in self.inner.oldest_first().skip(skip) {
            log_record(record);
        }
        written
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn log_record(record: &TelemetryRecord) {
    match record.event {
        TelemetryEventKind::StateChanged { from, to } => emit_state_change(
            record.cycle,
            record.sample.value(),
            record.elapsed_cycles,
            from.label(),
            to.label(),
        ),
        TelemetryEventKind::LoadSwitched(command) => emit_load_switch(
            record.cycle,
            record.sample.supply_millivolts(),
            command.label(),
        ),
    }
}

#[cfg(target_os = "none")]
fn log_cycle(report: &CycleReport) {
    let next = report.transition.next;
    defmt::debug!(
        "guard: cycle={} raw={=u8} {} {} waited={=u8}",
        report.cycle,
        report.sample.value(),
        report.transition.regime.label(),
        next.machine().label(),
        next.elapsed_cycles()
    );
}

#[cfg(not(target_os = "none"))]
fn log_cycle(_: &CycleReport) {}

#[cfg(target_os = "none")]
fn emit_state_change(cycle: u32, raw: u8, waited: u8, from: &'static str, to: &'static str) {
    defmt::info!(
        "guard: {} -> {} cycle={} raw={=u8} waited={=u8}",
        from,
        to,
        cycle,
        raw,
        waited
    );
}

#[cfg(not(target_os = "none"))]
fn emit_state_change(cycle: u32, raw: u8, waited: u8, from: &'static str, to: &'static str) {
    println!("guard: {from} -> {to} cycle={cycle} raw={raw} waited={waited}");
}

#[cfg(target_os = "none")]
fn emit_load_switch(cycle: u32, millivolts: u16, command: &'static str) {
    defmt::warn!("guard: {} cycle={} supply={=u16} mV", command, cycle, millivolts);
}

#[cfg(not(target_os = "none"))]
fn emit_load_switch(cycle: u32, millivolts: u16, command: &'static str) {
    println!("guard: {command} cycle={cycle} supply={millivolts} mV");
}

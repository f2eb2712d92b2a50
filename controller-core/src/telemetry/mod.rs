//! Telemetry event ring shared by firmware and host targets.
//!
//! Every wake cycle produces a [`CycleReport`], but almost all of them repeat
//! the previous cycle. The recorder keeps only the cycles where the machine
//! state changed or the load actually switched, in a fixed-capacity ring that
//! stays `no_std` friendly.

use core::fmt;

use heapless::HistoryBuf;

use crate::controller::{LoadCommand, MachineState};
use crate::orchestrator::CycleReport;
use crate::sampler::RawSample;

/// Identifier assigned to each telemetry record.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Notable events observed across wake cycles.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    StateChanged {
        from: MachineState,
        to: MachineState,
    },
    LoadSwitched(LoadCommand),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::StateChanged { from, to } => {
                write!(f, "state-changed {from}->{to}")
            }
            TelemetryEventKind::LoadSwitched(command) => write!(f, "switched {command}"),
        }
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub cycle: u32,
    pub sample: RawSample,
    pub elapsed_cycles: u8,
    pub event: TelemetryEventKind,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} cycle={} raw={} waited={} {}",
            self.id,
            self.cycle,
            self.sample.value(),
            self.elapsed_cycles,
            self.event
        )
    }
}

/// Records state changes and load switches into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    load_on: bool,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a recorder that assumes the load is connected, as it is at boot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            load_on: true,
            next_event_id: 0,
        }
    }

    /// Returns the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Last load level commanded by any recorded cycle.
    #[must_use]
    pub const fn load_on(&self) -> bool {
        self.load_on
    }

    /// Records the notable parts of a cycle and returns how many records were written.
    pub fn record_cycle(&mut self, report: &CycleReport) -> usize {
        let transition = &report.transition;
        let mut written = 0;

        if transition.state_changed() {
            self.record(
                report,
                TelemetryEventKind::StateChanged {
                    from: transition.previous.machine(),
                    to: transition.next.machine(),
                },
            );
            written += 1;
        }

        if let Some(command) = transition.command
            && command.is_on() != self.load_on
        {
            self.load_on = command.is_on();
            self.record(report, TelemetryEventKind::LoadSwitched(command));
            written += 1;
        }

        written
    }

    fn record(&mut self, report: &CycleReport, event: TelemetryEventKind) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            cycle: report.cycle,
            sample: report.sample,
            elapsed_cycles: report.transition.next.elapsed_cycles(),
            event,
        });

        id
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use crate::sampler::classify;

    fn drive(controller: &mut Controller, cycle: u32, raw: u8) -> CycleReport {
        let sample = RawSample::new(raw);
        CycleReport {
            cycle,
            sample,
            transition: controller.update(classify(sample)),
        }
    }

    #[test]
    fn repeated_alternator_on_records_nothing() {
        let mut controller = Controller::new();
        let mut recorder = TelemetryRecorder::<8>::new();

        for cycle in 0..4 {
            let report = drive(&mut controller, cycle, 230);
            assert_eq!(recorder.record_cycle(&report), 0);
        }

        assert!(recorder.is_empty());
    }

    #[test]
    fn battery_low_records_state_change_and_load_switch() {
        let mut controller = Controller::new();
        let mut recorder = TelemetryRecorder::<8>::new();

        let report = drive(&mut controller, 0, 200);
        assert_eq!(recorder.record_cycle(&report), 2);

        let events: heapless::Vec<TelemetryEventKind, 8> =
            recorder.oldest_first().map(|record| record.event).collect();
        assert_eq!(
            events.as_slice(),
            &[
                TelemetryEventKind::StateChanged {
                    from: MachineState::AlternatorOn,
                    to: MachineState::LoadOff,
                },
                TelemetryEventKind::LoadSwitched(LoadCommand::Off),
            ]
        );
        assert!(!recorder.load_on());

        let again = drive(&mut controller, 1, 200);
        assert_eq!(recorder.record_cycle(&again), 0);
    }

    #[test]
    fn ids_increase_and_ring_keeps_latest() {
        let mut controller = Controller::new();
        let mut recorder = TelemetryRecorder::<2>::new();

        recorder.record_cycle(&drive(&mut controller, 0, 200));
        recorder.record_cycle(&drive(&mut controller, 1, 230));

        assert_eq!(recorder.len(), 2);
        let latest = recorder.latest().copied().expect("latest record missing");
        assert_eq!(latest.id, 3);
        assert_eq!(latest.cycle, 1);
        assert_eq!(latest.event, TelemetryEventKind::LoadSwitched(LoadCommand::On));
    }
}

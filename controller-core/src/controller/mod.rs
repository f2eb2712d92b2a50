//! Load-control state machine.
//!
//! The controller consumes one [`VoltageRegime`] per wake tick. A dropped
//! alternator only disconnects the load after [`LOAD_OFF_TIMEOUT_CYCLES`]
//! consecutive ticks without charging, which rides out idle dips and regulator
//! noise. A battery-low reading bypasses the timeout and disconnects at once.
//!
//! Ticks are the only timebase: the MCU has no clock running while asleep, so
//! the timeout is counted in wake cycles of roughly [`TICK_PERIOD`].

use core::{fmt, time::Duration};

use crate::sampler::VoltageRegime;

/// Nominal interval between wake ticks.
pub const TICK_PERIOD: Duration = Duration::from_secs(4);

/// Wake cycles spent in [`MachineState::Waiting`] before the load is dropped.
pub const LOAD_OFF_TIMEOUT_CYCLES: u8 = 225;

/// Approximate wall-clock length of the load-off timeout (~15 minutes).
#[must_use]
pub const fn load_off_timeout() -> Duration {
    Duration::from_secs(TICK_PERIOD.as_secs() * LOAD_OFF_TIMEOUT_CYCLES as u64)
}

/// Persistent machine state.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum MachineState {
    #[default]
    AlternatorOn,
    Waiting,
    LoadOff,
}

impl MachineState {
    /// Short log label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            MachineState::AlternatorOn => "alternator-on",
            MachineState::Waiting => "waiting",
            MachineState::LoadOff => "load-off",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Level the load output should be driven to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LoadCommand {
    On,
    Off,
}

impl LoadCommand {
    /// Builds a command from a logical output level.
    #[must_use]
    pub const fn from_level(on: bool) -> Self {
        if on { LoadCommand::On } else { LoadCommand::Off }
    }

    /// Returns `true` when the command connects the load.
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, LoadCommand::On)
    }

    /// Short log label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            LoadCommand::On => "load-on",
            LoadCommand::Off => "load-off",
        }
    }
}

impl fmt::Display for LoadCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Machine state plus the saturating timeout counter.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ControllerState {
    machine: MachineState,
    elapsed_cycles: u8,
}

impl ControllerState {
    /// Boot state: alternator assumed running, counter cleared.
    pub const INITIAL: Self = Self {
        machine: MachineState::AlternatorOn,
        elapsed_cycles: 0,
    };

    /// Builds a state, clamping the counter to the timeout bound.
    ///
    /// Entering [`MachineState::AlternatorOn`] always clears the counter.
    #[must_use]
    pub const fn new(machine: MachineState, elapsed_cycles: u8) -> Self {
        let elapsed_cycles = match machine {
            MachineState::AlternatorOn => 0,
            _ if elapsed_cycles > LOAD_OFF_TIMEOUT_CYCLES => LOAD_OFF_TIMEOUT_CYCLES,
            _ => elapsed_cycles,
        };
        Self {
            machine,
            elapsed_cycles,
        }
    }

    /// Shorthand for a [`MachineState::Waiting`] state.
    #[must_use]
    pub const fn waiting(elapsed_cycles: u8) -> Self {
        Self::new(MachineState::Waiting, elapsed_cycles)
    }

    /// Current machine state.
    #[must_use]
    pub const fn machine(&self) -> MachineState {
        self.machine
    }

    /// Wake cycles counted toward the load-off timeout.
    #[must_use]
    pub const fn elapsed_cycles(&self) -> u8 {
        self.elapsed_cycles
    }

    /// Returns `true` once the counter has reached the timeout bound.
    #[must_use]
    pub const fn timeout_reached(&self) -> bool {
        self.elapsed_cycles >= LOAD_OFF_TIMEOUT_CYCLES
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}",
            self.machine, self.elapsed_cycles, LOAD_OFF_TIMEOUT_CYCLES
        )
    }
}

/// Advances the state machine by one wake cycle.
///
/// Returns the next state and the load command to issue, if any. A `None`
/// command leaves the load at whatever level it already has.
#[must_use]
pub const fn step(
    regime: VoltageRegime,
    state: ControllerState,
) -> (ControllerState, Option<LoadCommand>) {
    match regime {
        VoltageRegime::BatteryLow => (
            ControllerState {
                machine: MachineState::LoadOff,
                elapsed_cycles: state.elapsed_cycles,
            },
            Some(LoadCommand::Off),
        ),
        VoltageRegime::AlternatorOff => match state.machine {
            MachineState::AlternatorOn => (ControllerState::waiting(0), None),
            MachineState::Waiting | MachineState::LoadOff => {
                if state.timeout_reached() {
                    (
                        ControllerState::waiting(LOAD_OFF_TIMEOUT_CYCLES),
                        Some(LoadCommand::Off),
                    )
                } else {
                    (ControllerState::waiting(state.elapsed_cycles + 1), None)
                }
            }
        },
        VoltageRegime::AlternatorOn => (ControllerState::INITIAL, Some(LoadCommand::On)),
    }
}

/// Outcome of one controller evaluation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub regime: VoltageRegime,
    pub previous: ControllerState,
    pub next: ControllerState,
    pub command: Option<LoadCommand>,
}

impl Transition {
    /// Returns `true` when the machine state differs from the previous cycle.
    #[must_use]
    pub const fn state_changed(&self) -> bool {
        !matches!(
            (self.previous.machine, self.next.machine),
            (MachineState::AlternatorOn, MachineState::AlternatorOn)
                | (MachineState::Waiting, MachineState::Waiting)
                | (MachineState::LoadOff, MachineState::LoadOff)
        )
    }

    /// Returns `true` when this cycle dropped the load because the timeout ran out.
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        matches!(self.regime, VoltageRegime::AlternatorOff)
            && matches!(self.command, Some(LoadCommand::Off))
    }
}

/// Owner of the persistent [`ControllerState`].
#[derive(Clone, Debug, Default)]
pub struct Controller {
    state: ControllerState,
}

impl Controller {
    /// Creates a controller in the boot state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ControllerState::INITIAL,
        }
    }

    /// Resumes from an explicit state.
    #[must_use]
    pub const fn with_state(state: ControllerState) -> Self {
        Self { state }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Applies one observed regime and records the resulting state.
    pub fn update(&mut self, regime: VoltageRegime) -> Transition {
        let previous = self.state;
        let (next, command) = step(regime, previous);
        self.state = next;
        Transition {
            regime,
            previous,
            next,
            command,
        }
    }
}

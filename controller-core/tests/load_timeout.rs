use load_guard_core::controller::{
    Controller, ControllerState, LOAD_OFF_TIMEOUT_CYCLES, LoadCommand, MachineState, step,
};
use load_guard_core::sampler::VoltageRegime;

const ALL_STATES: [ControllerState; 5] = [
    ControllerState::INITIAL,
    ControllerState::waiting(0),
    ControllerState::waiting(100),
    ControllerState::waiting(LOAD_OFF_TIMEOUT_CYCLES),
    ControllerState::new(MachineState::LoadOff, 12),
];

#[test]
fn alternator_on_always_reconnects_and_clears_counter() {
    for state in ALL_STATES {
        let (next, command) = step(VoltageRegime::AlternatorOn, state);
        assert_eq!(next, ControllerState::INITIAL, "from {state}");
        assert_eq!(command, Some(LoadCommand::On), "from {state}");
    }
}

#[test]
fn battery_low_overrides_pending_timeout_from_every_state() {
    for state in ALL_STATES {
        let (next, command) = step(VoltageRegime::BatteryLow, state);
        assert_eq!(next.machine(), MachineState::LoadOff, "from {state}");
        assert_eq!(command, Some(LoadCommand::Off), "from {state}");
    }
}

#[test]
fn waiting_never_drops_load_before_bound() {
    let mut state = ControllerState::waiting(0);

    for expected in 1..=LOAD_OFF_TIMEOUT_CYCLES {
        let (next, command) = step(VoltageRegime::AlternatorOff, state);
        assert_eq!(command, None, "load dropped early at counter {expected}");
        assert_eq!(next.machine(), MachineState::Waiting);
        assert_eq!(next.elapsed_cycles(), expected);
        state = next;
    }

    let (next, command) = step(VoltageRegime::AlternatorOff, state);
    assert_eq!(command, Some(LoadCommand::Off));
    assert_eq!(next.elapsed_cycles(), LOAD_OFF_TIMEOUT_CYCLES);
}

#[test]
fn counter_stays_saturated_while_alternator_stays_off() {
    let mut controller = Controller::with_state(ControllerState::waiting(LOAD_OFF_TIMEOUT_CYCLES));

    for _ in 0..10 {
        let transition = controller.update(VoltageRegime::AlternatorOff);
        assert_eq!(transition.command, Some(LoadCommand::Off));
        assert_eq!(
            transition.next,
            ControllerState::waiting(LOAD_OFF_TIMEOUT_CYCLES)
        );
    }
}

#[test]
fn engine_stop_disconnects_exactly_at_bound() {
    let mut controller = Controller::new();
    let bound = usize::from(LOAD_OFF_TIMEOUT_CYCLES);

    // Sample 1 only enters `Waiting`; samples 2..=226 count up to the bound.
    let commands: Vec<Option<LoadCommand>> = (1..=bound + 2)
        .map(|_| controller.update(VoltageRegime::AlternatorOff).command)
        .collect();

    assert!(commands[..bound].iter().all(Option::is_none));
    assert_eq!(commands[bound - 1], None, "sample 225 must not disconnect");
    assert_eq!(commands[bound], None, "sample 226 only reaches the bound");
    assert_eq!(commands[bound + 1], Some(LoadCommand::Off), "sample 227 disconnects");
    assert!(controller.state().timeout_reached());
}

#[test]
fn engine_stop_counter_trace() {
    let mut controller = Controller::new();

    let entry = controller.update(VoltageRegime::AlternatorOff);
    assert_eq!(entry.next, ControllerState::waiting(0));
    assert_eq!(entry.command, None);

    for waited in 1..=LOAD_OFF_TIMEOUT_CYCLES {
        let transition = controller.update(VoltageRegime::AlternatorOff);
        assert_eq!(transition.command, None, "early disconnect after {waited} waits");
        assert_eq!(transition.next.elapsed_cycles(), waited);
    }
    assert!(controller.state().timeout_reached());

    let cutoff = controller.update(VoltageRegime::AlternatorOff);
    assert_eq!(cutoff.command, Some(LoadCommand::Off));
    assert!(cutoff.timed_out());
}

#[test]
fn alternator_return_resets_partial_wait() {
    let mut controller = Controller::with_state(ControllerState::waiting(100));

    let transition = controller.update(VoltageRegime::AlternatorOn);

    assert_eq!(transition.next.machine(), MachineState::AlternatorOn);
    assert_eq!(transition.next.elapsed_cycles(), 0);
    assert_eq!(transition.command, Some(LoadCommand::On));
}

#[test]
fn brief_dip_does_not_touch_load() {
    let mut controller = Controller::new();
    let trace = [
        VoltageRegime::AlternatorOn,
        VoltageRegime::AlternatorOff,
        VoltageRegime::AlternatorOff,
        VoltageRegime::AlternatorOff,
        VoltageRegime::AlternatorOn,
    ];

    let commands: Vec<Option<LoadCommand>> = trace
        .iter()
        .map(|regime| controller.update(*regime).command)
        .collect();

    assert_eq!(
        commands,
        vec![
            Some(LoadCommand::On),
            None,
            None,
            None,
            Some(LoadCommand::On)
        ]
    );
}

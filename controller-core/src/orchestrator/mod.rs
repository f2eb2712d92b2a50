//! Wake-cycle orchestration shared between firmware and host targets.
//!
//! The hardware collaborator is reduced to three capabilities: take one raw
//! sample, drive the load output, and suspend until the next wake tick. Each
//! cycle samples first, then classifies, steps the controller, and applies the
//! resulting command inside an [`ExclusiveSection`] so interrupt-driven
//! variants cannot observe a half-updated state.

use crate::controller::{Controller, ControllerState, Transition};
use crate::sampler::{RawSample, classify};

/// Produces one raw supply-voltage reading, blocking while the conversion runs.
pub trait VoltageSampler {
    fn sample(&mut self) -> RawSample;
}

/// Drives the load-switch output. Repeating a level is harmless.
pub trait LoadDriver {
    fn set_load(&mut self, on: bool);
}

/// Suspends the processor until the next periodic wake tick.
pub trait WakeTimer {
    fn wait_for_tick(&mut self);
}

/// Runs a closure without interruption from concurrent contexts.
pub trait ExclusiveSection {
    fn run<R>(&mut self, f: impl FnOnce() -> R) -> R;
}

/// Exclusive section for strictly single-threaded targets.
#[derive(Copy, Clone, Debug, Default)]
pub struct Unguarded;

impl ExclusiveSection for Unguarded {
    fn run<R>(&mut self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

/// Load driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopLoadDriver;

impl NoopLoadDriver {
    /// Creates a new no-op load driver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LoadDriver for NoopLoadDriver {
    fn set_load(&mut self, _: bool) {}
}

/// Wake timer that returns immediately.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopWakeTimer;

impl NoopWakeTimer {
    /// Creates a new no-op wake timer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl WakeTimer for NoopWakeTimer {
    fn wait_for_tick(&mut self) {}
}

/// Summary of one wake cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CycleReport {
    /// Wake cycles completed before this one (wraps).
    pub cycle: u32,
    pub sample: RawSample,
    pub transition: Transition,
}

/// Owns the collaborators and the controller for the lifetime of the program.
pub struct CycleRunner<S, L, X = Unguarded> {
    sampler: S,
    load: L,
    section: X,
    controller: Controller,
    cycles: u32,
}

impl<S, L> CycleRunner<S, L, Unguarded>
where
    S: VoltageSampler,
    L: LoadDriver,
{
    /// Powers up a single-threaded runner and connects the load.
    #[must_use]
    pub fn boot(sampler: S, load: L) -> Self {
        Self::boot_guarded(sampler, load, Unguarded)
    }
}

impl<S, L, X> CycleRunner<S, L, X>
where
    S: VoltageSampler,
    L: LoadDriver,
    X: ExclusiveSection,
{
    /// Powers up a runner whose evaluations run inside `section`.
    ///
    /// The load is driven on before the first sample: start-up assumes the
    /// engine is running or the battery is healthy.
    #[must_use]
    pub fn boot_guarded(sampler: S, mut load: L, section: X) -> Self {
        load.set_load(true);
        Self {
            sampler,
            load,
            section,
            controller: Controller::new(),
            cycles: 0,
        }
    }

    /// Current controller state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.controller.state()
    }

    /// Number of completed wake cycles (wraps).
    #[must_use]
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Provides access to the sampler.
    #[must_use]
    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Provides mutable access to the sampler.
    pub fn sampler_mut(&mut self) -> &mut S {
        &mut self.sampler
    }

    /// Provides access to the load driver.
    #[must_use]
    pub fn load(&self) -> &L {
        &self.load
    }

    /// Classifies `raw`, steps the controller, and applies the command.
    pub fn evaluate(&mut self, raw: RawSample) -> CycleReport {
        let cycle = self.cycles;
        let controller = &mut self.controller;
        let load = &mut self.load;

        let transition = self.section.run(|| {
            let transition = controller.update(classify(raw));
            if let Some(command) = transition.command {
                load.set_load(command.is_on());
            }
            transition
        });

        self.cycles = self.cycles.wrapping_add(1);
        CycleReport {
            cycle,
            sample: raw,
            transition,
        }
    }

    /// Takes one sample and evaluates it.
    pub fn run_cycle(&mut self) -> CycleReport {
        let raw = self.sampler.sample();
        self.evaluate(raw)
    }

    /// Runs one cycle, then sleeps until the next wake tick.
    pub fn tick<W: WakeTimer>(&mut self, timer: &mut W) -> CycleReport {
        let report = self.run_cycle();
        timer.wait_for_tick();
        report
    }

    /// Cycles forever, handing every report to `observe`.
    pub fn run<W, F>(mut self, mut timer: W, mut observe: F) -> !
    where
        W: WakeTimer,
        F: FnMut(&CycleReport),
    {
        loop {
            let report = self.tick(&mut timer);
            observe(&report);
        }
    }
}

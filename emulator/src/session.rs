use std::collections::VecDeque;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use load_guard_core::controller::{
    ControllerState, LOAD_OFF_TIMEOUT_CYCLES, LoadCommand, TICK_PERIOD,
};
use load_guard_core::orchestrator::{
    CycleReport, CycleRunner, LoadDriver, VoltageSampler, WakeTimer,
};
use load_guard_core::sampler::{ALTERNATOR_ON_THRESHOLD, RawSample, VoltageThresholds, classify};
use load_guard_core::telemetry::TelemetryRecorder;

use crate::scenario::{Directive, ScenarioError, parse_line};

const HELP_LINES: &[&str] = &[
    "Directives hold a supply level for one or more wake ticks:",
    "  <volts>V [x<count>]     e.g. `12.8V x300`",
    "  mv <millivolts> [x<count>]",
    "  raw <0-255> [x<count>]",
    "Other commands: status, help, exit",
];

/// Errors surfaced while driving a session.
#[derive(Debug)]
pub enum EmulatorError {
    Io(io::Error),
    Scenario(ScenarioError),
}

impl fmt::Display for EmulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulatorError::Io(err) => write!(f, "i/o error: {err}"),
            EmulatorError::Scenario(err) => write!(f, "scenario error: {err}"),
        }
    }
}

impl std::error::Error for EmulatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmulatorError::Io(err) => Some(err),
            EmulatorError::Scenario(err) => Some(err),
        }
    }
}

impl From<io::Error> for EmulatorError {
    fn from(err: io::Error) -> Self {
        EmulatorError::Io(err)
    }
}

impl From<ScenarioError> for EmulatorError {
    fn from(err: ScenarioError) -> Self {
        EmulatorError::Scenario(err)
    }
}

/// Host sampler fed from scenario directives.
///
/// Queued readings are consumed one per wake cycle. Once the queue drains the
/// supply stays at the last level it reported.
pub struct HeldSupply {
    queue: VecDeque<RawSample>,
    held: RawSample,
}

impl HeldSupply {
    pub fn new(initial: RawSample) -> Self {
        Self {
            queue: VecDeque::new(),
            held: initial,
        }
    }

    pub fn push(&mut self, sample: RawSample) {
        self.queue.push_back(sample);
    }

    pub fn held(&self) -> RawSample {
        self.held
    }
}

impl VoltageSampler for HeldSupply {
    fn sample(&mut self) -> RawSample {
        if let Some(next) = self.queue.pop_front() {
            self.held = next;
        }
        self.held
    }
}

/// Load driver that remembers its level and counts actual switches.
#[derive(Debug, Default)]
pub struct RecordingLoad {
    level: bool,
    switches: u32,
}

impl RecordingLoad {
    pub fn is_on(&self) -> bool {
        self.level
    }

    pub fn switches(&self) -> u32 {
        self.switches
    }
}

impl LoadDriver for RecordingLoad {
    fn set_load(&mut self, on: bool) {
        if self.level != on {
            self.switches += 1;
        }
        self.level = on;
    }
}

/// Wake timer that advances simulated time instead of sleeping.
#[derive(Debug, Default)]
pub struct SimulatedClock {
    elapsed: Duration,
}

impl SimulatedClock {
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl WakeTimer for SimulatedClock {
    fn wait_for_tick(&mut self) {
        self.elapsed += TICK_PERIOD;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum TranscriptRole {
    Input,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Input => "IN  >",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn create(path: &Path, title: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header(title)?;
        Ok(logger)
    }

    fn write_header(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.writer, "# {title}")?;
        writeln!(
            self.writer,
            "# Timestamps are simulated time since power-up ({} s per wake tick)",
            TICK_PERIOD.as_secs()
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[{}] {} {}",
            format_clock(elapsed),
            role.prefix(),
            line
        )
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Drives the shared cycle runner against simulated supply levels.
///
/// Output is written line by line as cycles complete, so long directives
/// stream instead of accumulating.
pub struct Session {
    runner: CycleRunner<HeldSupply, RecordingLoad>,
    clock: SimulatedClock,
    telemetry: TelemetryRecorder,
    transcript: Option<TranscriptLogger>,
    quiet: bool,
    lines_seen: usize,
}

impl Session {
    /// Powers up a session with the supply resting at the charging threshold.
    pub fn new(quiet: bool) -> Self {
        Self {
            runner: CycleRunner::boot(
                HeldSupply::new(ALTERNATOR_ON_THRESHOLD),
                RecordingLoad::default(),
            ),
            clock: SimulatedClock::default(),
            telemetry: TelemetryRecorder::new(),
            transcript: None,
            quiet,
            lines_seen: 0,
        }
    }

    /// Mirrors every input and output line into a transcript file.
    pub fn attach_transcript(&mut self, path: &Path, title: &str) -> io::Result<()> {
        self.transcript = Some(TranscriptLogger::create(path, title)?);
        Ok(())
    }

    pub fn state(&self) -> ControllerState {
        self.runner.state()
    }

    pub fn load_on(&self) -> bool {
        self.runner.load().is_on()
    }

    pub fn load_switches(&self) -> u32 {
        self.runner.load().switches()
    }

    pub fn cycles(&self) -> u32 {
        self.runner.cycles()
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    /// Handles one interactive line: a directive or a session command.
    pub fn handle_line(&mut self, line: &str, out: &mut impl Write) -> Result<(), EmulatorError> {
        self.lines_seen += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        let elapsed = self.clock.elapsed();
        self.record_input(elapsed, trimmed)?;

        let command = trimmed.split('#').next().unwrap_or_default().trim_end();
        if command.eq_ignore_ascii_case("help") {
            for line in HELP_LINES {
                self.emit(elapsed, line, out)?;
            }
        } else if command.eq_ignore_ascii_case("status") {
            let status = self.status_line();
            self.emit(elapsed, &status, out)?;
        } else if let Some(directive) = parse_line(self.lines_seen, trimmed)? {
            self.run_directive(directive, out)?;
        }

        self.flush_transcript()?;
        Ok(())
    }

    /// Holds the directive's level for its repeat count, writing each cycle as it runs.
    pub fn run_directive(&mut self, directive: Directive, out: &mut impl Write) -> io::Result<()> {
        for _ in 0..directive.repeat {
            let at = self.clock.elapsed();
            self.runner.sampler_mut().push(directive.sample);
            let report = self.runner.tick(&mut self.clock);

            if !self.quiet {
                let line = self.describe_cycle(at, &report);
                self.emit(at, &line, out)?;
            }

            let written = self.telemetry.record_cycle(&report);
            let events: Vec<String> = self
                .telemetry
                .oldest_first()
                .skip(self.telemetry.len() - written)
                .map(|record| format!("EVENT {record}"))
                .collect();
            for event in &events {
                self.emit(at, event, out)?;
            }
        }

        self.flush_transcript()
    }

    /// Replays a parsed scenario in order.
    pub fn run_scenario(
        &mut self,
        directives: &[Directive],
        out: &mut impl Write,
    ) -> io::Result<()> {
        for directive in directives {
            self.run_directive(*directive, out)?;
        }
        Ok(())
    }

    /// One-line summary of the controller and load.
    pub fn status_line(&self) -> String {
        let thresholds = VoltageThresholds::DEFAULT;
        format!(
            "status t={} cycles={} supply={} state={} {} switches={} \
             thresholds=low<={} on>={} timeout={}x{}s",
            format_clock(self.elapsed()),
            self.cycles(),
            self.runner.sampler().held(),
            self.state(),
            LoadCommand::from_level(self.load_on()),
            self.load_switches(),
            thresholds.battery_low().value(),
            thresholds.alternator_on().value(),
            LOAD_OFF_TIMEOUT_CYCLES,
            TICK_PERIOD.as_secs(),
        )
    }

    fn describe_cycle(&self, at: Duration, report: &CycleReport) -> String {
        format!(
            "[{}] cycle {:>5} raw {} {:<14} {} {}",
            format_clock(at),
            report.cycle,
            report.sample,
            classify(report.sample).label(),
            report.transition.next,
            LoadCommand::from_level(self.load_on()),
        )
    }

    fn emit(&mut self, elapsed: Duration, line: &str, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{line}")?;
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(elapsed, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }

    fn record_input(&mut self, elapsed: Duration, line: &str) -> io::Result<()> {
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(elapsed, TranscriptRole::Input, line)?;
        }
        Ok(())
    }

    fn flush_transcript(&mut self) -> io::Result<()> {
        match self.transcript.as_mut() {
            Some(transcript) => transcript.flush(),
            None => Ok(()),
        }
    }
}

fn format_clock(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3_600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::parse_scenario;
    use load_guard_core::controller::MachineState;

    fn lines_of(output: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(output)
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn run_line(session: &mut Session, line: &str) -> Result<Vec<String>, EmulatorError> {
        let mut out = Vec::new();
        session.handle_line(line, &mut out)?;
        Ok(lines_of(&out))
    }

    fn replay(session: &mut Session, scenario: &str) -> Vec<String> {
        let directives = parse_scenario(scenario).expect("valid scenario");
        let mut out = Vec::new();
        session
            .run_scenario(&directives, &mut out)
            .expect("scenario runs");
        lines_of(&out)
    }

    /// Accepts a fixed number of lines, then fails every write.
    struct LineBudget {
        lines: Vec<u8>,
        remaining: usize,
    }

    impl Write for LineBudget {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "line budget spent"));
            }
            self.remaining -= buf.iter().filter(|byte| **byte == b'\n').count();
            self.lines.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn boot_connects_load() {
        let session = Session::new(false);
        assert!(session.load_on());
        assert_eq!(session.load_switches(), 1);
        assert_eq!(session.cycles(), 0);
    }

    #[test]
    fn engine_stop_scenario_disconnects_after_fifteen_minutes() {
        let mut session = Session::new(true);

        let lines = replay(&mut session, "14.2V x5\n12.8V x230\n");

        assert!(!session.load_on());
        assert_eq!(session.state().machine(), MachineState::Waiting);
        assert_eq!(session.elapsed(), TICK_PERIOD * 235);
        let cutoff = lines
            .iter()
            .find(|line| line.contains("switched load-off"))
            .expect("cutoff event missing");
        assert!(cutoff.contains("cycle=231"), "{cutoff}");
    }

    #[test]
    fn long_directive_streams_each_cycle_to_the_writer() {
        let mut session = Session::new(false);
        let directive = parse_line(1, "12.8V x1000000")
            .expect("line parses")
            .expect("line holds a directive");
        let mut out = LineBudget {
            lines: Vec::new(),
            remaining: 10,
        };

        let error = session
            .run_directive(directive, &mut out)
            .expect_err("writer refuses output past its budget");

        assert_eq!(error.kind(), io::ErrorKind::WriteZero);
        // Cycle 0 also emits the state-change event, so nine cycles fill ten lines.
        assert_eq!(lines_of(&out.lines).len(), 10);
        assert_eq!(session.cycles(), 10);
    }

    #[test]
    fn quiet_session_prints_only_events() {
        let mut session = Session::new(true);
        let lines = run_line(&mut session, "14V x3").expect("directive should run");
        assert!(lines.is_empty());

        let lines = run_line(&mut session, "raw 200").expect("directive should run");
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|line| line.starts_with("EVENT ")));
    }

    #[test]
    fn verbose_session_prints_every_cycle() {
        let mut session = Session::new(false);
        let lines = run_line(&mut session, "12.9V x4").expect("directive should run");

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("[00:00:00] cycle     0"), "{}", lines[0]);
        assert!(lines[0].contains("alternator-off"));
        assert!(lines[4].starts_with("[00:00:12]"), "{}", lines[4]);
        assert!(lines[4].contains("waiting 3/225 load-on"), "{}", lines[4]);
    }

    #[test]
    fn idle_dip_keeps_load_connected() {
        let mut session = Session::new(true);

        replay(&mut session, "14V x5\n12.9V x20\n14V x5");

        assert!(session.load_on());
        assert_eq!(session.load_switches(), 1);
        assert_eq!(session.state().machine(), MachineState::AlternatorOn);
    }

    #[test]
    fn invalid_line_reports_line_number() {
        let mut session = Session::new(false);
        run_line(&mut session, "14V").expect("first line is valid");

        let error = run_line(&mut session, "raw 999").expect_err("out of range");
        assert!(matches!(
            error,
            EmulatorError::Scenario(ScenarioError::SampleOutOfRange { line: 2, value: 999 })
        ));
        assert_eq!(session.cycles(), 1);
    }

    #[test]
    fn status_and_help_do_not_advance_cycles() {
        let mut session = Session::new(false);

        let status = run_line(&mut session, "status").expect("status works");
        assert_eq!(status.len(), 1);
        assert!(status[0].contains("load-on"), "{}", status[0]);
        assert!(status[0].contains("thresholds=low<=211 on>=225"), "{}", status[0]);
        assert!(status[0].contains("timeout=225x4s"), "{}", status[0]);

        let help = run_line(&mut session, "HELP").expect("help works");
        assert_eq!(help.len(), HELP_LINES.len());
        assert_eq!(session.cycles(), 0);
    }

    #[test]
    fn commands_accept_trailing_comments() {
        let mut session = Session::new(false);

        let status = run_line(&mut session, "status # before the engine stops").expect("status");
        assert_eq!(status.len(), 1);
        assert!(status[0].starts_with("status "), "{}", status[0]);

        let help = run_line(&mut session, "help   # directives").expect("help");
        assert_eq!(help.len(), HELP_LINES.len());

        let comment = run_line(&mut session, "# only a note").expect("comment");
        assert!(comment.is_empty());
        assert_eq!(session.cycles(), 0);
    }

    #[test]
    fn transcript_mirrors_input_and_output() {
        let path = std::env::temp_dir().join(format!(
            "load-guard-transcript-{}.log",
            std::process::id()
        ));
        let mut session = Session::new(true);
        session
            .attach_transcript(&path, "Battery low cutoff")
            .expect("transcript opens");

        run_line(&mut session, "raw 205").expect("directive runs");
        drop(session);

        let text = fs::read_to_string(&path).expect("transcript readable");
        fs::remove_file(&path).ok();

        assert!(text.starts_with("# Battery low cutoff\n"));
        assert!(text.contains("[00:00:00] IN  > raw 205"));
        assert!(text.contains("EMU < EVENT #1 cycle=0 raw=205 waited=0 switched load-off"));
    }
}

mod scenario;
mod session;

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use scenario::parse_scenario;
use session::{EmulatorError, Session};

const USAGE: &str = "Usage: load-guard-emulator [--quiet] [--transcript <path>] [scenario-file]";

#[derive(Debug, Default, Eq, PartialEq)]
struct Options {
    quiet: bool,
    transcript: Option<PathBuf>,
    scenario: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let mut session = Session::new(options.quiet);
    if let Some(path) = options.transcript.as_deref() {
        let title = match options.scenario.as_deref() {
            Some(scenario) => format!("Load guard scenario {}", scenario.display()),
            None => "Load guard interactive session".to_string(),
        };
        session.attach_transcript(path, &title)?;
    }

    let stdout = io::stdout();
    let mut writer = stdout.lock();

    match options.scenario {
        Some(path) => run_scenario_file(&mut session, &path, &mut writer)?,
        None => run_interactive(&mut session, &mut writer)?,
    }

    writeln!(
        writer,
        "{} ({} telemetry events)",
        session.status_line(),
        session.telemetry().len()
    )?;
    Ok(())
}

fn run_scenario_file(
    session: &mut Session,
    path: &Path,
    writer: &mut impl Write,
) -> io::Result<()> {
    let text = fs::read_to_string(path)?;
    let directives = parse_scenario(&text).unwrap_or_else(|err| {
        eprintln!("{}: {err}", path.display());
        process::exit(2);
    });

    session.run_scenario(&directives, writer)
}

fn run_interactive(session: &mut Session, writer: &mut impl Write) -> io::Result<()> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Load guard emulator ready. Type `help` for directives or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        if should_terminate(line.trim()) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        match session.handle_line(&line, writer) {
            Ok(()) => {}
            Err(EmulatorError::Scenario(err)) => writeln!(writer, "ERR {err}")?,
            Err(EmulatorError::Io(err)) => return Err(err),
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options::default();

    while let Some(arg) = args.next() {
        if arg == "--quiet" || arg == "-q" {
            options.quiet = true;
        } else if let Some(value) = arg.strip_prefix("--transcript=") {
            options.transcript = Some(PathBuf::from(value));
        } else if arg == "--transcript" {
            let value = args
                .next()
                .ok_or_else(|| "Expected value after --transcript".to_string())?;
            options.transcript = Some(PathBuf::from(value));
        } else if arg.starts_with('-') {
            return Err(format!("Unknown option {arg}"));
        } else if options.scenario.is_some() {
            return Err(format!("Unexpected argument {arg}"));
        } else {
            options.scenario = Some(PathBuf::from(arg));
        }
    }

    Ok(options)
}

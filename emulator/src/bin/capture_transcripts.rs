use std::io;
use std::path::Path;

#[allow(dead_code)]
#[path = "../scenario.rs"]
mod scenario;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use scenario::parse_scenario;
use session::Session;

const ENGINE_STOP: &str = "\
# Engine running, then parked with the alternator off for sixteen minutes.
14.2V x5
12.8V x240
";

const BATTERY_LOW: &str = "\
# Engine stops, the battery sags under load, then the engine restarts.
14.0V x3
12.8V x10
12.2V x3
raw 211
14.1V x2
";

const IDLE_DIP: &str = "\
# Charging voltage sags at idle for a minute and a half, then recovers.
14.0V x5
12.9V x20
14.0V x5
";

fn main() -> io::Result<()> {
    record("engine_stop", "Engine stop with load-off timeout", ENGINE_STOP, true)?;
    record("battery_low", "Battery-low cutoff and restart", BATTERY_LOW, false)?;
    record("idle_dip", "Brief idle dip keeps the load", IDLE_DIP, false)?;
    Ok(())
}

fn record(name: &str, title: &str, text: &str, quiet: bool) -> io::Result<()> {
    let directives =
        parse_scenario(text).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

    let path = Path::new("transcripts").join(format!("{name}.log"));
    let mut session = Session::new(quiet);
    session.attach_transcript(&path, title)?;
    session.run_scenario(&directives, &mut io::sink())?;

    println!("{}: {}", path.display(), session.status_line());
    Ok(())
}

//! Scenario directives for the emulator.
//!
//! A scenario is a list of supply levels, one per line, each held for a number
//! of wake ticks:
//!
//! ```text
//! # engine running, then stopped for twenty minutes
//! 14.1V x10
//! 12.8V x300
//! raw 205
//! mv 13500 x5
//! ```
//!
//! Levels are written in volts (`12.8V`), millivolts (`mv 12800`), or raw ADC
//! units (`raw 218`). The repeat count defaults to one tick.

use std::fmt;

use load_guard_core::sampler::RawSample;
use winnow::ascii::{Caseless, dec_uint, digit1, space0, space1};
use winnow::combinator::{alt, delimited, opt, preceded};
use winnow::prelude::*;
use winnow::token::one_of;

/// One supply level held for `repeat` wake ticks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Directive {
    pub sample: RawSample,
    pub repeat: u32,
}

/// Errors reported while reading a scenario.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScenarioError {
    Syntax { line: usize, column: usize },
    SampleOutOfRange { line: usize, value: u32 },
    ZeroRepeat { line: usize },
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Syntax { line, column } => write!(
                f,
                "line {line}: expected `<volts>V`, `mv <millivolts>` or `raw <0-255>` \
                 with optional `x<count>` (column {column})"
            ),
            ScenarioError::SampleOutOfRange { line, value } => {
                write!(f, "line {line}: raw sample {value} exceeds 255")
            }
            ScenarioError::ZeroRepeat { line } => {
                write!(f, "line {line}: repeat count must be at least 1")
            }
        }
    }
}

impl std::error::Error for ScenarioError {}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Level {
    Raw(u32),
    Millivolts(u32),
}

/// Parses a whole scenario, skipping blank lines and comments.
pub fn parse_scenario(text: &str) -> Result<Vec<Directive>, ScenarioError> {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| parse_line(index + 1, line).transpose())
        .collect()
}

/// Parses one scenario line. Blank and comment-only lines yield `None`.
pub fn parse_line(line_number: usize, line: &str) -> Result<Option<Directive>, ScenarioError> {
    let content = line.split('#').next().unwrap_or_default().trim_end();
    if content.trim_start().is_empty() {
        return Ok(None);
    }

    let (level, repeat) = directive.parse(content).map_err(|err| ScenarioError::Syntax {
        line: line_number,
        column: err.offset() + 1,
    })?;

    if repeat == 0 {
        return Err(ScenarioError::ZeroRepeat { line: line_number });
    }

    let sample = match level {
        Level::Raw(value) => u8::try_from(value)
            .map(RawSample::new)
            .map_err(|_| ScenarioError::SampleOutOfRange {
                line: line_number,
                value,
            })?,
        Level::Millivolts(millivolts) => RawSample::from_supply_millivolts(millivolts),
    };

    Ok(Some(Directive { sample, repeat }))
}

fn directive(input: &mut &str) -> ModalResult<(Level, u32)> {
    delimited(
        space0,
        (
            alt((raw_level, millivolt_level, volt_level)),
            opt(preceded((space1, one_of(['x', 'X'])), dec_uint)),
        ),
        space0,
    )
    .map(|(level, repeat)| (level, repeat.unwrap_or(1)))
    .parse_next(input)
}

fn raw_level(input: &mut &str) -> ModalResult<Level> {
    preceded((Caseless("raw"), space1), dec_uint)
        .map(Level::Raw)
        .parse_next(input)
}

fn millivolt_level(input: &mut &str) -> ModalResult<Level> {
    preceded((Caseless("mv"), space1), dec_uint)
        .map(Level::Millivolts)
        .parse_next(input)
}

fn volt_level(input: &mut &str) -> ModalResult<Level> {
    (dec_uint, opt(preceded('.', digit1)), one_of(['V', 'v']))
        .map(|(whole, fraction, _): (u32, Option<&str>, char)| {
            let millivolts = whole
                .saturating_mul(1_000)
                .saturating_add(fraction.map_or(0, fraction_millis));
            Level::Millivolts(millivolts)
        })
        .parse_next(input)
}

// Keeps three decimal places; further digits are below ADC resolution.
fn fraction_millis(digits: &str) -> u32 {
    digits
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .fold(0, |acc, digit| acc * 10 + u32::from(digit - b'0'))
}

//! Morse timing encoder
//!
//! Turns text into a sequence of vibration pulses using standard
//! International Morse Code timing. Pure and allocation-only: no I/O,
//! no clocks.

mod table;

use std::num::NonZeroU32;
use std::time::Duration;

pub use table::code_for;

/// Milliseconds in one unit at 1 WPM ("PARIS" timing: 50 units per word)
const MS_PER_UNIT_AT_ONE_WPM: f64 = 1200.0;

const DOT_UNITS: f64 = 1.0;
const DASH_UNITS: f64 = 3.0;
const SYMBOL_GAP_UNITS: f64 = 1.0;
const CHAR_GAP_UNITS: f64 = 3.0;
const WORD_GAP_UNITS: f64 = 7.0;

/// One pulse: vibrate for `duration_ms`, then stay idle for `gap_ms`.
///
/// Values are kept in fractional milliseconds so that speeds which do not
/// divide 1200 evenly don't accumulate rounding error across a message.
/// A zero `duration_ms` is a silent word gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseStep {
    pub duration_ms: f64,
    pub gap_ms: f64,
}

impl PulseStep {
    /// Whether this step actually drives the actuator
    pub fn is_pulse(&self) -> bool {
        self.duration_ms > 0.0
    }

    /// Actuation length, rounded to the nanosecond at the last moment
    pub fn duration(&self) -> Duration {
        millis_to_duration(self.duration_ms)
    }

    /// Time to wait before the next step starts (pulse plus trailing gap)
    pub fn span(&self) -> Duration {
        millis_to_duration(self.duration_ms + self.gap_ms)
    }
}

/// An ordered, single-use list of pulse steps.
///
/// Consumed front-to-back by the playback sequencer. To replay a message,
/// encode it again.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PulseSequence {
    steps: Vec<PulseStep>,
}

impl PulseSequence {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[PulseStep] {
        &self.steps
    }

    /// Total playback time if every step runs to completion
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(PulseStep::span).sum()
    }
}

impl IntoIterator for PulseSequence {
    type Item = PulseStep;
    type IntoIter = std::vec::IntoIter<PulseStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

fn millis_to_duration(ms: f64) -> Duration {
    Duration::from_nanos((ms.max(0.0) * 1_000_000.0).round() as u64)
}

/// Length of one Morse unit in milliseconds at the given speed
pub fn unit_ms(wpm: NonZeroU32) -> f64 {
    MS_PER_UNIT_AT_ONE_WPM / f64::from(wpm.get())
}

/// Uppercase and keep only characters the encoder can send
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == ' ')
        .collect()
}

/// Encode `text` as a pulse sequence at `wpm` words per minute.
///
/// Unsupported characters are dropped silently. Each space becomes its own
/// silent step of seven units; the last symbol of every character carries
/// the three-unit inter-character gap.
pub fn encode(text: &str, wpm: NonZeroU32) -> PulseSequence {
    let unit = unit_ms(wpm);
    let mut steps = Vec::new();

    for c in normalize(text).chars() {
        if c == ' ' {
            steps.push(PulseStep {
                duration_ms: 0.0,
                gap_ms: unit * WORD_GAP_UNITS,
            });
            continue;
        }

        let Some(code) = code_for(c) else {
            continue;
        };

        let last = code.len() - 1;
        for (i, symbol) in code.bytes().enumerate() {
            let units = if symbol == b'.' { DOT_UNITS } else { DASH_UNITS };
            let gap_units = if i == last { CHAR_GAP_UNITS } else { SYMBOL_GAP_UNITS };

            steps.push(PulseStep {
                duration_ms: unit * units,
                gap_ms: unit * gap_units,
            });
        }
    }

    PulseSequence { steps }
}

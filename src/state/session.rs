//! Session data owned by the controller

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Requested verbosity of a sampled description
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetailLevel {
    Summary,
    Standard,
    Detailed,
}

impl DetailLevel {
    pub const ALL: [DetailLevel; 3] = [Self::Summary, Self::Standard, Self::Detailed];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// One step more verbose, or `None` at the top
    pub fn increased(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// One step less verbose, or `None` at the bottom
    pub fn decreased(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// Wire name used by the classifier
    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Summary => "SUMMARY",
            DetailLevel::Standard => "STANDARD",
            DetailLevel::Detailed => "DETAILED",
        }
    }
}

impl Default for DetailLevel {
    fn default() -> Self {
        Self::Standard
    }
}

impl std::fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible state, derived from the session flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Waiting for a gesture
    Idle,
    /// Holding: heartbeat and periodic sampling
    Recording,
    /// Playing a description back as Morse pulses
    PlayingBack,
}

impl Default for State {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Recording => write!(f, "Recording"),
            State::PlayingBack => write!(f, "PlayingBack"),
        }
    }
}

/// Live state of the one capture cycle per process.
///
/// `recording` and `playing_back` are never both set; the setters clear the
/// other flag first.
#[derive(Debug, Clone)]
pub struct Session {
    recording: bool,
    playing_back: bool,
    pub detail_level: DetailLevel,
    pub speed_wpm: NonZeroU32,
}

impl Session {
    pub fn new(speed_wpm: NonZeroU32) -> Self {
        Self {
            recording: false,
            playing_back: false,
            detail_level: DetailLevel::default(),
            speed_wpm,
        }
    }

    pub fn state(&self) -> State {
        match (self.recording, self.playing_back) {
            (true, _) => State::Recording,
            (false, true) => State::PlayingBack,
            (false, false) => State::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_playing_back(&self) -> bool {
        self.playing_back
    }

    pub fn set_recording(&mut self) {
        self.playing_back = false;
        self.recording = true;
    }

    pub fn set_playing_back(&mut self) {
        self.recording = false;
        self.playing_back = true;
    }

    pub fn set_idle(&mut self) {
        self.recording = false;
        self.playing_back = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_level_steps_are_clamped() {
        assert_eq!(DetailLevel::Summary.decreased(), None);
        assert_eq!(DetailLevel::Detailed.increased(), None);
        assert_eq!(DetailLevel::Standard.increased(), Some(DetailLevel::Detailed));
        assert_eq!(DetailLevel::Standard.decreased(), Some(DetailLevel::Summary));
        assert!(DetailLevel::Summary < DetailLevel::Detailed);
    }

    #[test]
    fn test_detail_level_wire_name() {
        let json = serde_json::to_string(&DetailLevel::Detailed).unwrap();
        assert_eq!(json, r#""DETAILED""#);
        assert_eq!(DetailLevel::default().to_string(), "STANDARD");
    }

    #[test]
    fn test_flags_are_mutually_exclusive() {
        let mut session = Session::new(NonZeroU32::new(20).unwrap());
        assert_eq!(session.state(), State::Idle);

        session.set_recording();
        assert_eq!(session.state(), State::Recording);

        session.set_playing_back();
        assert!(!session.is_recording());
        assert_eq!(session.state(), State::PlayingBack);

        session.set_recording();
        assert!(!session.is_playing_back());

        session.set_idle();
        assert_eq!(session.state(), State::Idle);
    }
}

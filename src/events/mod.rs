//! Events module for controller transitions
//!
//! Provides structured event types for recording, sampling and playback
//! transitions. The IPC server keeps its status snapshot current from these
//! and pushes them to subscribed clients.

use serde::{Deserialize, Serialize};

use crate::state::DetailLevel;

/// Events emitted by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// Controller is running and accepting gestures
    Ready,

    /// Hold threshold met, sampling loop running
    RecordingStarted {
        detail_level: DetailLevel,
    },

    /// Recording ended, either by the user or by an accepted description
    RecordingStopped {
        /// Duration in milliseconds that recording was active
        duration_ms: u64,
    },

    /// A sample produced no description; the loop keeps going
    SampleFailed {
        reason: String,
    },

    /// A description (or the self-test text) is being played back
    PlaybackStarted {
        text: String,
        /// Number of pulse steps in the sequence
        steps: usize,
    },

    /// Playback ended
    PlaybackFinished {
        /// False when the sequence was cancelled before its last step
        completed: bool,
        duration_ms: u64,
    },

    /// Detail level moved by one step
    DetailLevelChanged {
        level: DetailLevel,
    },

    /// Morse speed changed for subsequent playbacks
    SpeedChanged {
        wpm: u32,
    },
}

impl std::fmt::Display for StateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEvent::Ready => write!(f, "READY"),
            StateEvent::RecordingStarted { detail_level } => {
                write!(f, "RECORDING_STARTED ({})", detail_level)
            }
            StateEvent::RecordingStopped { duration_ms } => {
                write!(f, "RECORDING_STOPPED ({}ms)", duration_ms)
            }
            StateEvent::SampleFailed { reason } => write!(f, "SAMPLE_FAILED ({})", reason),
            StateEvent::PlaybackStarted { steps, .. } => {
                write!(f, "PLAYBACK_STARTED ({} steps)", steps)
            }
            StateEvent::PlaybackFinished { completed, duration_ms } => {
                let outcome = if *completed { "completed" } else { "cancelled" };
                write!(f, "PLAYBACK_FINISHED ({}, {}ms)", outcome, duration_ms)
            }
            StateEvent::DetailLevelChanged { level } => {
                write!(f, "DETAIL_LEVEL_CHANGED ({})", level)
            }
            StateEvent::SpeedChanged { wpm } => write!(f, "SPEED_CHANGED ({} wpm)", wpm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = StateEvent::RecordingStopped { duration_ms: 1500 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("recording_stopped"));
        assert!(json.contains("1500"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"detail_level_changed","level":"SUMMARY"}"#;
        let event: StateEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            StateEvent::DetailLevelChanged { level: DetailLevel::Summary }
        );
    }

    #[test]
    fn test_ready_is_a_bare_tag() {
        let json = serde_json::to_string(&StateEvent::Ready).unwrap();
        assert_eq!(json, r#"{"type":"ready"}"#);
    }

    #[test]
    fn test_display() {
        let event = StateEvent::PlaybackFinished { completed: false, duration_ms: 42 };
        assert_eq!(event.to_string(), "PLAYBACK_FINISHED (cancelled, 42ms)");
    }
}

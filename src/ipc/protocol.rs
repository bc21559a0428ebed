//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::StateEvent;
use crate::haptics::HapticCommand;
use crate::input::InputEvent;
use crate::state::{DetailLevel, State};

/// Requests from clients to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to state events and haptic commands
    Subscribe,

    /// Inject a gesture, as if it came from a local input source
    Gesture { event: InputEvent },

    /// Change the Morse speed for the next playback
    SetSpeed { wpm: u32 },
}

/// Responses from daemon to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Gesture or speed change queued for the controller
    Accepted,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    /// Controller transition
    StateEvent(StateEvent),
    /// Haptic command for the device to execute
    Haptic(HapticCommand),
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Current controller state
    pub state: State,

    /// Current requested detail level
    pub detail_level: DetailLevel,

    /// Morse speed for playback
    pub speed_wpm: u32,

    /// Human readable status line
    pub status_text: String,

    /// Whether a local input listener is running
    pub input_listener: bool,

    /// Controller has started and sent its ready pulse
    pub ready: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

const READY_TEXT: &str = "Ready";

impl DaemonStatus {
    pub fn new(speed_wpm: u32, input_listener: bool) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: State::Idle,
            detail_level: DetailLevel::default(),
            speed_wpm,
            status_text: READY_TEXT.to_string(),
            input_listener,
            ready: false,
            uptime_secs: 0,
        }
    }

    /// Fold a controller event into the snapshot
    pub fn apply(&mut self, event: &StateEvent) {
        match event {
            StateEvent::Ready => {
                self.ready = true;
            }
            StateEvent::RecordingStarted { detail_level } => {
                self.state = State::Recording;
                self.detail_level = *detail_level;
                self.status_text = "Recording...".to_string();
            }
            StateEvent::RecordingStopped { .. } | StateEvent::PlaybackFinished { .. } => {
                self.state = State::Idle;
                self.status_text = READY_TEXT.to_string();
            }
            StateEvent::SampleFailed { reason } => {
                self.status_text = format!("Error: {reason}");
            }
            StateEvent::PlaybackStarted { text, .. } => {
                self.state = State::PlayingBack;
                self.status_text = format!("Playing: \"{text}\"");
            }
            StateEvent::DetailLevelChanged { level } => {
                self.detail_level = *level;
            }
            StateEvent::SpeedChanged { wpm } => {
                self.speed_wpm = *wpm;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::PulseKind;
    use crate::input::LevelDirection;

    #[test]
    fn test_request_serialization() {
        let req = Request::Gesture {
            event: InputEvent::LevelAdjust { direction: LevelDirection::Up },
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"type":"gesture","event":{"type":"level_adjust","direction":"up"}}"#
        );

        let req: Request = serde_json::from_str(r#"{"type":"set_speed","wpm":15}"#).unwrap();
        assert!(matches!(req, Request::SetSpeed { wpm: 15 }));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::new(20, false));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""detail_level":"STANDARD""#));
    }

    #[test]
    fn test_notification_nests_tagged_payload() {
        let note = Notification::Haptic(HapticCommand::Pulse { kind: PulseKind::LightImpact });
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(
            json,
            r#"{"type":"haptic","payload":{"type":"pulse","kind":"light_impact"}}"#
        );
    }

    #[test]
    fn test_status_follows_events() {
        let mut status = DaemonStatus::new(20, true);
        assert!(!status.ready);

        status.apply(&StateEvent::Ready);
        assert!(status.ready);
        assert_eq!(status.status_text, "Ready");

        status.apply(&StateEvent::RecordingStarted { detail_level: DetailLevel::Summary });
        assert_eq!(status.state, State::Recording);
        assert_eq!(status.status_text, "Recording...");

        status.apply(&StateEvent::SampleFailed { reason: "timeout".into() });
        assert_eq!(status.state, State::Recording);
        assert_eq!(status.status_text, "Error: timeout");

        status.apply(&StateEvent::RecordingStopped { duration_ms: 900 });
        status.apply(&StateEvent::PlaybackStarted { text: "door".into(), steps: 9 });
        assert_eq!(status.state, State::PlayingBack);
        assert_eq!(status.status_text, "Playing: \"door\"");

        status.apply(&StateEvent::PlaybackFinished { completed: true, duration_ms: 2000 });
        assert_eq!(status.state, State::Idle);
        assert_eq!(status.status_text, "Ready");

        status.apply(&StateEvent::SpeedChanged { wpm: 12 });
        assert_eq!(status.speed_wpm, 12);
    }
}

//! Gesture input
//!
//! Everything that drives the controller arrives as an [`InputEvent`] on an
//! mpsc channel: IPC clients inject them directly, and on macOS a global
//! modifier-key listener synthesizes them from key presses.

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
mod keys;
#[cfg(target_os = "macos")]
mod listener;

use serde::{Deserialize, Serialize};

#[cfg(target_os = "macos")]
pub use listener::HotkeyListener;

/// Direction of a detail-level adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelDirection {
    /// Towards more detail
    Up,
    /// Towards less detail
    Down,
}

/// Discrete gesture events consumed by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// Finger/key went down
    PressStart,
    /// Finger/key lifted
    PressRelease,
    /// The press was interrupted by the system
    PressCancel,
    /// Vertical swipe equivalent
    LevelAdjust { direction: LevelDirection },
    /// Rapid double tap: play the self-test message
    DoubleActivate,
    /// Stop whatever is running and go idle
    Stop,
}

impl std::fmt::Display for InputEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputEvent::PressStart => write!(f, "PRESS_START"),
            InputEvent::PressRelease => write!(f, "PRESS_RELEASE"),
            InputEvent::PressCancel => write!(f, "PRESS_CANCEL"),
            InputEvent::LevelAdjust { direction: LevelDirection::Up } => write!(f, "LEVEL_UP"),
            InputEvent::LevelAdjust { direction: LevelDirection::Down } => write!(f, "LEVEL_DOWN"),
            InputEvent::DoubleActivate => write!(f, "DOUBLE_ACTIVATE"),
            InputEvent::Stop => write!(f, "STOP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_event_serialization() {
        let event = InputEvent::LevelAdjust { direction: LevelDirection::Down };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"level_adjust","direction":"down"}"#);
    }

    #[test]
    fn test_input_event_deserialization() {
        let event: InputEvent = serde_json::from_str(r#"{"type":"press_start"}"#).unwrap();
        assert_eq!(event, InputEvent::PressStart);
    }
}

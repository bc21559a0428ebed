//! Modifier key state and translation into gestures
//!
//! Control is the press key. Tapping it twice quickly is the double
//! activation. Option on its own raises the detail level and Command on its
//! own lowers it.

use std::time::{Duration, Instant};

use super::{InputEvent, LevelDirection};

/// Second Control press within this window counts as a double activation
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(350);

/// Modifier key flag masks from macOS CGEventFlags
#[cfg(target_os = "macos")]
pub mod flags {
    use core_graphics::event::CGEventFlags;

    /// Control key modifier flag
    pub const CONTROL: CGEventFlags = CGEventFlags::CGEventFlagControl;
    /// Option/Alt key modifier flag
    pub const OPTION: CGEventFlags = CGEventFlags::CGEventFlagAlternate;
    /// Command key modifier flag
    pub const COMMAND: CGEventFlags = CGEventFlags::CGEventFlagCommand;
}

/// Tracks which modifier keys are currently pressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Control key is held
    pub control: bool,
    /// Option/Alt key is held
    pub option: bool,
    /// Command key is held
    pub command: bool,
}

impl ModifierState {
    /// Create a new ModifierState from CGEventFlags
    #[cfg(target_os = "macos")]
    pub fn from_flags(event_flags: core_graphics::event::CGEventFlags) -> Self {
        Self {
            control: event_flags.contains(flags::CONTROL),
            option: event_flags.contains(flags::OPTION),
            command: event_flags.contains(flags::COMMAND),
        }
    }

    /// Check if only Option is pressed
    pub fn is_option_only(&self) -> bool {
        self.option && !self.control && !self.command
    }

    /// Check if only Command is pressed
    pub fn is_command_only(&self) -> bool {
        self.command && !self.control && !self.option
    }
}

/// Turns successive modifier snapshots into gesture events
#[derive(Debug, Default)]
pub struct GestureTranslator {
    prev: ModifierState,
    last_press: Option<Instant>,
}

impl GestureTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next modifier snapshot; returns the gestures it completes
    pub fn translate(&mut self, next: ModifierState, now: Instant) -> Vec<InputEvent> {
        let prev = std::mem::replace(&mut self.prev, next);
        let mut events = Vec::new();

        if next.control && !prev.control {
            events.push(InputEvent::PressStart);

            let is_double = self
                .last_press
                .is_some_and(|at| now.duration_since(at) <= DOUBLE_TAP_WINDOW);
            if is_double {
                events.push(InputEvent::DoubleActivate);
                self.last_press = None;
            } else {
                self.last_press = Some(now);
            }
        } else if !next.control && prev.control {
            events.push(InputEvent::PressRelease);
        }

        if next.is_option_only() && !prev.option {
            events.push(InputEvent::LevelAdjust { direction: LevelDirection::Up });
        }
        if next.is_command_only() && !prev.command {
            events.push(InputEvent::LevelAdjust { direction: LevelDirection::Down });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROL: ModifierState = ModifierState { control: true, option: false, command: false };
    const OPTION: ModifierState = ModifierState { control: false, option: true, command: false };
    const COMMAND: ModifierState = ModifierState { control: false, option: false, command: true };
    const NONE: ModifierState = ModifierState { control: false, option: false, command: false };

    #[test]
    fn test_control_press_and_release() {
        let mut translator = GestureTranslator::new();
        let t0 = Instant::now();

        assert_eq!(translator.translate(CONTROL, t0), vec![InputEvent::PressStart]);
        assert_eq!(
            translator.translate(NONE, t0 + Duration::from_millis(400)),
            vec![InputEvent::PressRelease]
        );
    }

    #[test]
    fn test_quick_second_press_is_double_activation() {
        let mut translator = GestureTranslator::new();
        let t0 = Instant::now();

        translator.translate(CONTROL, t0);
        translator.translate(NONE, t0 + Duration::from_millis(80));
        assert_eq!(
            translator.translate(CONTROL, t0 + Duration::from_millis(200)),
            vec![InputEvent::PressStart, InputEvent::DoubleActivate]
        );

        // A third press right after does not chain into another double
        translator.translate(NONE, t0 + Duration::from_millis(260));
        assert_eq!(
            translator.translate(CONTROL, t0 + Duration::from_millis(320)),
            vec![InputEvent::PressStart]
        );
    }

    #[test]
    fn test_slow_second_press_is_not_double() {
        let mut translator = GestureTranslator::new();
        let t0 = Instant::now();

        translator.translate(CONTROL, t0);
        translator.translate(NONE, t0 + Duration::from_millis(100));
        assert_eq!(
            translator.translate(CONTROL, t0 + Duration::from_millis(900)),
            vec![InputEvent::PressStart]
        );
    }

    #[test]
    fn test_option_and_command_adjust_level() {
        let mut translator = GestureTranslator::new();
        let t0 = Instant::now();

        assert_eq!(
            translator.translate(OPTION, t0),
            vec![InputEvent::LevelAdjust { direction: LevelDirection::Up }]
        );
        // Holding does not repeat
        assert!(translator.translate(OPTION, t0).is_empty());
        translator.translate(NONE, t0);
        assert_eq!(
            translator.translate(COMMAND, t0),
            vec![InputEvent::LevelAdjust { direction: LevelDirection::Down }]
        );
    }

    #[test]
    fn test_chords_do_not_adjust_level() {
        let mut translator = GestureTranslator::new();
        let t0 = Instant::now();

        translator.translate(CONTROL, t0);
        let chord = ModifierState { control: true, option: true, command: false };
        assert!(translator.translate(chord, t0).is_empty());
    }
}

//! Capture/playback state machine
//!
//! Three states:
//! - Idle: waiting for a gesture
//! - Recording: press held past the threshold, sampling every tick
//! - PlayingBack: an accepted description is being pulsed out as Morse

mod controller;
mod playback;
mod recording;
mod session;

pub use controller::{Command, Controller, ControllerSettings};
pub use session::{DetailLevel, State};

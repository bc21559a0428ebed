//! Haptic output
//!
//! The controller drives an [`Actuator`]; the daemon ships a
//! [`BroadcastActuator`] that hands every command to the device-side haptic
//! layer through IPC subscribers.

mod actuator;
mod broadcast;

pub use actuator::{Actuator, HapticError, PulseKind};
pub use broadcast::{BroadcastActuator, HapticCommand};

//! Actuator that forwards commands to subscribed haptic clients

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use super::actuator::{Actuator, HapticError, PulseKind};

/// A command for the device-side haptic layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HapticCommand {
    /// Vibrate for a (possibly fractional) number of milliseconds
    Vibrate { duration_ms: f64 },
    /// Play a named pattern
    Pulse { kind: PulseKind },
}

/// Publishes haptic commands on a broadcast channel.
///
/// The IPC server relays them to subscribed clients, which own the actual
/// vibration motor.
#[derive(Debug, Clone)]
pub struct BroadcastActuator {
    tx: broadcast::Sender<HapticCommand>,
}

impl BroadcastActuator {
    pub fn new(tx: broadcast::Sender<HapticCommand>) -> Self {
        Self { tx }
    }

    fn publish(&self, command: HapticCommand) -> Result<(), HapticError> {
        trace!(?command, "publishing haptic command");
        self.tx
            .send(command)
            .map(|_| ())
            .map_err(|_| HapticError::NoListener)
    }
}

#[async_trait]
impl Actuator for BroadcastActuator {
    async fn vibrate(&self, duration: Duration) -> Result<(), HapticError> {
        self.publish(HapticCommand::Vibrate {
            duration_ms: duration.as_secs_f64() * 1000.0,
        })
    }

    async fn pulse(&self, kind: PulseKind) -> Result<(), HapticError> {
        self.publish(HapticCommand::Pulse { kind })
    }
}

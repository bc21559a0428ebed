//! Actuator capability consumed by the controller

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Named haptic patterns provided by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseKind {
    /// Recording heartbeat
    LightImpact,
    /// Detail level decreased
    MediumImpact,
    /// Detail level increased
    HeavyImpact,
    /// Daemon is ready
    SuccessNotification,
}

impl std::fmt::Display for PulseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PulseKind::LightImpact => write!(f, "light"),
            PulseKind::MediumImpact => write!(f, "medium"),
            PulseKind::HeavyImpact => write!(f, "heavy"),
            PulseKind::SuccessNotification => write!(f, "success"),
        }
    }
}

/// Errors from a haptic backend.
///
/// These are always best-effort failures: callers log them and carry on.
#[derive(Debug, thiserror::Error)]
pub enum HapticError {
    #[error("no haptic device is listening")]
    NoListener,
}

/// Something that can vibrate
#[async_trait]
pub trait Actuator: Send + Sync + 'static {
    /// Vibrate continuously for `duration`
    async fn vibrate(&self, duration: Duration) -> Result<(), HapticError>;

    /// Play one of the device's named patterns
    async fn pulse(&self, kind: PulseKind) -> Result<(), HapticError>;
}

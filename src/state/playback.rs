//! Playback sequencer: pulses a Morse sequence through the actuator

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::haptics::Actuator;
use crate::morse::PulseSequence;

use super::controller::TaskMessage;

/// Play `sequence` step by step until it is exhausted or `cancel` fires.
///
/// The token is checked before every step and raced against every wait, so
/// no step begins after cancellation.
pub(super) async fn play<A: Actuator>(
    sequence: PulseSequence,
    actuator: Arc<A>,
    cancel: CancellationToken,
    generation: u64,
    task_tx: mpsc::Sender<TaskMessage>,
) {
    let mut completed = true;

    for (index, step) in sequence.into_iter().enumerate() {
        if cancel.is_cancelled() {
            completed = false;
            break;
        }

        if step.is_pulse() {
            if let Err(e) = actuator.vibrate(step.duration()).await {
                debug!(?e, index, "morse pulse not delivered");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(step.span()) => {}
            _ = cancel.cancelled() => {
                completed = false;
                break;
            }
        }
    }

    debug!(generation, completed, "playback sequence ended");
    let _ = task_tx
        .send(TaskMessage::PlaybackDone { generation, completed })
        .await;
}

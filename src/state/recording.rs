//! Recording loop: heartbeat pulses and periodic sampling while held

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::haptics::{Actuator, PulseKind};
use crate::sampler::{FrameSampler, SampleError};

use super::controller::TaskMessage;
use super::session::DetailLevel;

/// Everything one recording session's loop needs
pub(super) struct RecordingLoop<S, A> {
    pub generation: u64,
    pub interval: Duration,
    pub sample_timeout: Duration,
    pub sampler: Arc<S>,
    pub actuator: Arc<A>,
    pub level_rx: watch::Receiver<DetailLevel>,
    pub task_tx: mpsc::Sender<TaskMessage>,
    pub cancel: CancellationToken,
}

impl<S: FrameSampler, A: Actuator> RecordingLoop<S, A> {
    /// Immediate heartbeat, then heartbeat + sample on every tick until
    /// cancelled.
    ///
    /// Sampler calls run as their own tasks so a slow classifier never
    /// delays the next tick.
    pub(super) async fn run(self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.heartbeat().await;

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.cancel.cancelled() => break,
            }

            // Both branches can be ready at once
            if self.cancel.is_cancelled() {
                debug!(generation = self.generation, "dropping tick after stop");
                break;
            }

            self.heartbeat().await;

            if self.cancel.is_cancelled() {
                break;
            }

            let level = *self.level_rx.borrow();
            tokio::spawn(sample_once(
                Arc::clone(&self.sampler),
                level,
                self.sample_timeout,
                self.cancel.clone(),
                self.generation,
                self.task_tx.clone(),
            ));
        }

        debug!(generation = self.generation, "recording loop exited");
    }

    async fn heartbeat(&self) {
        if let Err(e) = self.actuator.pulse(PulseKind::LightImpact).await {
            debug!(?e, "heartbeat not delivered");
        }
    }
}

/// One bounded sampler round-trip, reported back to the controller
async fn sample_once<S: FrameSampler>(
    sampler: Arc<S>,
    level: DetailLevel,
    timeout: Duration,
    cancel: CancellationToken,
    generation: u64,
    task_tx: mpsc::Sender<TaskMessage>,
) {
    let result = tokio::select! {
        outcome = tokio::time::timeout(timeout, sampler.sample(level)) => {
            outcome.unwrap_or_else(|_| Err(SampleError::Timeout(timeout)))
        }
        _ = cancel.cancelled() => {
            debug!(generation, "sample abandoned, recording stopped");
            return;
        }
    };

    let _ = task_tx.send(TaskMessage::Sample { generation, result }).await;
}

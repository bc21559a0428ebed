//! Core controller implementation
//!
//! Owns the session and is the only place it changes. Gesture input, the
//! hold timer and completions from spawned work (sampler round-trips,
//! playback) are all handled serially in one `select!` loop, so every
//! completion is checked against live state before it has any effect.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::StateEvent;
use crate::haptics::{Actuator, HapticError, PulseKind};
use crate::input::{InputEvent, LevelDirection};
use crate::morse;
use crate::sampler::{FrameSampler, SampleError};

use super::playback;
use super::recording::RecordingLoop;
use super::session::{DetailLevel, Session, State};

/// Played on double activation instead of a sampled description
pub const SELF_TEST_TEXT: &str = "READY";

/// Timing knobs for the controller
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// How long a press must be held before recording starts
    pub hold_threshold: Duration,
    /// Heartbeat and sampling period while recording
    pub sample_interval: Duration,
    /// Upper bound for one sampler round-trip
    pub sample_timeout: Duration,
    /// Initial Morse speed
    pub speed_wpm: NonZeroU32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            hold_threshold: Duration::from_millis(250),
            sample_interval: Duration::from_millis(250),
            sample_timeout: Duration::from_secs(3),
            speed_wpm: NonZeroU32::new(20).unwrap_or(NonZeroU32::MIN),
        }
    }
}

/// Messages accepted by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// A gesture from any input source
    Input(InputEvent),
    /// Change the Morse speed for subsequent playbacks
    SetSpeed(NonZeroU32),
}

impl From<InputEvent> for Command {
    fn from(event: InputEvent) -> Self {
        Command::Input(event)
    }
}

/// Completion reports from spawned work, tagged with their session
#[derive(Debug)]
pub(super) enum TaskMessage {
    Sample {
        generation: u64,
        result: Result<Option<String>, SampleError>,
    },
    PlaybackDone {
        generation: u64,
        completed: bool,
    },
}

/// A running recording loop or playback sequence
struct ActiveTask {
    generation: u64,
    cancel: CancellationToken,
    started_at: Instant,
}

impl ActiveTask {
    fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

/// The capture/playback controller
pub struct Controller<S, A> {
    session: Session,
    settings: ControllerSettings,
    sampler: Arc<S>,
    actuator: Arc<A>,
    /// Channel for emitting state events
    event_tx: broadcast::Sender<StateEvent>,
    task_tx: mpsc::Sender<TaskMessage>,
    task_rx: mpsc::Receiver<TaskMessage>,
    /// Live detail level for the recording loop
    level_tx: watch::Sender<DetailLevel>,
    /// A press is currently down
    pressed: bool,
    /// Pending hold timer, if a press is inside the hold window
    hold_deadline: Option<Instant>,
    /// Bumped for every recording or playback started
    generation: u64,
    recording: Option<ActiveTask>,
    playback: Option<ActiveTask>,
}

impl<S: FrameSampler, A: Actuator> Controller<S, A> {
    pub fn new(
        settings: ControllerSettings,
        sampler: Arc<S>,
        actuator: Arc<A>,
        event_tx: broadcast::Sender<StateEvent>,
    ) -> Self {
        let (task_tx, task_rx) = mpsc::channel(64);
        let (level_tx, _) = watch::channel(DetailLevel::default());

        Self {
            session: Session::new(settings.speed_wpm),
            settings,
            sampler,
            actuator,
            event_tx,
            task_tx,
            task_rx,
            level_tx,
            pressed: false,
            hold_deadline: None,
            generation: 0,
            recording: None,
            playback: None,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the controller until the command channel closes
    pub async fn run(&mut self, mut command_rx: mpsc::Receiver<Command>) {
        info!(wpm = self.session.speed_wpm.get(), "controller started in Idle state");
        self.signal_ready().await;

        loop {
            let hold_deadline = self.hold_deadline;

            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(Command::Input(event)) => self.handle_input(event),
                    Some(Command::SetSpeed(wpm)) => self.set_speed(wpm),
                    None => break,
                },
                Some(message) = self.task_rx.recv() => {
                    self.handle_task_message(message);
                }
                _ = wait_for_hold(hold_deadline) => {
                    self.on_hold_elapsed();
                }
            }
        }

        self.stop_recording();
        self.stop_playback();
        info!("controller stopped");
    }

    /// One-off readiness pulse at startup.
    ///
    /// Devices that subscribe later get the same pulse from the IPC server
    /// once it has seen `Ready`.
    async fn signal_ready(&self) {
        match self.actuator.pulse(PulseKind::SuccessNotification).await {
            Ok(()) => info!("ready pulse sent"),
            Err(HapticError::NoListener) => debug!("no device listening for the ready pulse yet"),
        }
        self.emit(StateEvent::Ready);
    }

    fn handle_input(&mut self, event: InputEvent) {
        debug!(%event, state = %self.session.state(), "input event");

        match event {
            InputEvent::PressStart => self.on_press_start(),
            InputEvent::PressRelease | InputEvent::PressCancel => self.on_press_end(),
            InputEvent::LevelAdjust { direction } => self.adjust_level(direction),
            InputEvent::DoubleActivate => self.on_double_activate(),
            InputEvent::Stop => {
                self.pressed = false;
                self.hold_deadline = None;
                self.stop_recording();
                self.stop_playback();
            }
        }
    }

    fn on_press_start(&mut self) {
        self.pressed = true;

        // A new press always silences playback
        if self.session.is_playing_back() {
            debug!("press interrupts playback");
            self.stop_playback();
        }

        self.hold_deadline = Some(Instant::now() + self.settings.hold_threshold);
    }

    fn on_press_end(&mut self) {
        self.pressed = false;

        if self.hold_deadline.take().is_some() {
            debug!("released before hold threshold");
        }

        self.stop_recording();
    }

    fn on_hold_elapsed(&mut self) {
        self.hold_deadline = None;

        if !self.pressed || self.session.is_recording() {
            return;
        }

        self.start_recording();
    }

    fn on_double_activate(&mut self) {
        if self.session.state() != State::Idle {
            debug!(state = %self.session.state(), "double activation ignored");
            return;
        }

        info!("self-test playback requested");
        self.start_playback(SELF_TEST_TEXT.to_string());
    }

    fn adjust_level(&mut self, direction: LevelDirection) {
        let current = self.session.detail_level;
        let (next, kind) = match direction {
            LevelDirection::Up => (current.increased(), PulseKind::HeavyImpact),
            LevelDirection::Down => (current.decreased(), PulseKind::MediumImpact),
        };

        let Some(next) = next else {
            debug!(level = %current, ?direction, "detail level already at limit");
            return;
        };

        info!(from = %current, to = %next, "detail level changed");
        self.session.detail_level = next;
        self.level_tx.send_replace(next);
        self.spawn_pulse(kind);
        self.emit(StateEvent::DetailLevelChanged { level: next });
    }

    fn set_speed(&mut self, wpm: NonZeroU32) {
        if self.session.speed_wpm == wpm {
            return;
        }

        info!(from = self.session.speed_wpm.get(), to = wpm.get(), "morse speed changed");
        self.session.speed_wpm = wpm;
        self.emit(StateEvent::SpeedChanged { wpm: wpm.get() });
    }

    fn handle_task_message(&mut self, message: TaskMessage) {
        match message {
            TaskMessage::Sample { generation, result } => self.on_sample(generation, result),
            TaskMessage::PlaybackDone { generation, completed } => {
                self.on_playback_done(generation, completed)
            }
        }
    }

    /// Act on a sampler result only if its recording session is still live
    fn on_sample(&mut self, generation: u64, result: Result<Option<String>, SampleError>) {
        let live = self.session.is_recording()
            && self.recording.as_ref().map(|t| t.generation) == Some(generation);
        if !live {
            debug!(generation, "discarding sample from finished recording");
            return;
        }

        match result {
            Ok(Some(text)) if !text.trim().is_empty() => {
                info!(generation, chars = text.len(), "description accepted");
                self.start_playback(text);
            }
            Ok(_) => {
                debug!(generation, "sample returned no description");
            }
            Err(e) => {
                warn!(generation, error = %e, "sample failed, waiting for next tick");
                self.emit(StateEvent::SampleFailed { reason: e.to_string() });
            }
        }
    }

    fn on_playback_done(&mut self, generation: u64, completed: bool) {
        if self.playback.as_ref().map(|t| t.generation) != Some(generation) {
            debug!(generation, "ignoring completion of cancelled playback");
            return;
        }

        if let Some(task) = self.playback.take() {
            self.session.set_idle();

            let duration_ms = task.elapsed_ms();
            info!(generation, completed, duration_ms, "playback finished");
            self.emit(StateEvent::PlaybackFinished { completed, duration_ms });
        }
    }

    fn start_recording(&mut self) {
        self.stop_playback();

        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();

        let recording_loop = RecordingLoop {
            generation,
            interval: self.settings.sample_interval,
            sample_timeout: self.settings.sample_timeout,
            sampler: Arc::clone(&self.sampler),
            actuator: Arc::clone(&self.actuator),
            level_rx: self.level_tx.subscribe(),
            task_tx: self.task_tx.clone(),
            cancel: cancel.clone(),
        };
        tokio::spawn(recording_loop.run());

        self.session.set_recording();
        self.recording = Some(ActiveTask {
            generation,
            cancel,
            started_at: Instant::now(),
        });

        info!(
            from = %State::Idle,
            to = %State::Recording,
            generation,
            detail_level = %self.session.detail_level,
            "state transition"
        );
        self.emit(StateEvent::RecordingStarted {
            detail_level: self.session.detail_level,
        });
    }

    fn stop_recording(&mut self) {
        let Some(task) = self.recording.take() else {
            return;
        };

        task.cancel.cancel();
        self.session.set_idle();

        let duration_ms = task.elapsed_ms();
        info!(
            from = %State::Recording,
            generation = task.generation,
            duration_ms,
            "recording stopped"
        );
        self.emit(StateEvent::RecordingStopped { duration_ms });
    }

    fn start_playback(&mut self, text: String) {
        self.stop_recording();
        self.stop_playback();

        let sequence = morse::encode(&text, self.session.speed_wpm);
        if sequence.is_empty() {
            debug!(%text, "nothing encodable, playback will finish at once");
        }

        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();

        info!(
            to = %State::PlayingBack,
            generation,
            steps = sequence.len(),
            pulses = sequence.steps().iter().filter(|s| s.is_pulse()).count(),
            total_ms = sequence.total_duration().as_millis() as u64,
            "state transition"
        );
        self.emit(StateEvent::PlaybackStarted {
            text,
            steps: sequence.len(),
        });

        tokio::spawn(playback::play(
            sequence,
            Arc::clone(&self.actuator),
            cancel.clone(),
            generation,
            self.task_tx.clone(),
        ));

        self.session.set_playing_back();
        self.playback = Some(ActiveTask {
            generation,
            cancel,
            started_at: Instant::now(),
        });
    }

    fn stop_playback(&mut self) {
        let Some(task) = self.playback.take() else {
            return;
        };

        task.cancel.cancel();
        self.session.set_idle();

        let duration_ms = task.elapsed_ms();
        info!(generation = task.generation, duration_ms, "playback cancelled");
        self.emit(StateEvent::PlaybackFinished {
            completed: false,
            duration_ms,
        });
    }

    /// Fire-and-forget named pulse; failures are logged only
    fn spawn_pulse(&self, kind: PulseKind) {
        let actuator = Arc::clone(&self.actuator);
        tokio::spawn(async move {
            if let Err(e) = actuator.pulse(kind).await {
                debug!(?e, %kind, "pulse not delivered");
            }
        });
    }

    fn emit(&self, event: StateEvent) {
        debug!(%event, "emitting state event");
        let _ = self.event_tx.send(event);
    }
}

async fn wait_for_hold(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

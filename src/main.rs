//! haptic-morse-daemon: press-and-hold scanning with Morse haptic playback
//!
//! This daemon runs in the background and provides:
//! - Press/hold gesture handling with an explicit capture/playback controller
//! - Periodic frame sampling against a remote image classifier while held
//! - Morse-code vibration playback of the returned description
//! - IPC for status queries, gesture injection and haptic command delivery
//!
//! Out of scope: rendering, camera capture and the vibration motor itself.
//! Those live in the device-side client, which talks to this daemon over
//! the Unix socket.

mod config;
mod events;
mod haptics;
mod input;
mod ipc;
mod lifecycle;
mod morse;
mod sampler;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::StateEvent;
use crate::haptics::{BroadcastActuator, HapticCommand};
use crate::ipc::{DaemonStatus, Notification, Server};
use crate::lifecycle::ShutdownSignal;
use crate::sampler::{FileFrameSource, HttpSampler};
use crate::state::Controller;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "haptic-morse-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        socket = ?config.socket_path,
        api_url = %config.api_url,
        frame = ?config.frame_path,
        wpm = config.speed_wpm.get(),
        "configuration loaded"
    );

    let mut shutdown = ShutdownSignal::new().context("failed to register signal handlers")?;

    // Input sources -> controller
    let (command_tx, command_rx) = mpsc::channel(64);
    // Controller -> IPC server (status + notifications)
    let (event_tx, _) = broadcast::channel::<StateEvent>(64);
    // Actuator -> IPC subscribers
    let (haptic_tx, _) = broadcast::channel::<HapticCommand>(256);

    let sampler = Arc::new(HttpSampler::new(
        &config.api_url,
        FileFrameSource::new(&config.frame_path),
    ));
    info!(endpoint = sampler.endpoint(), "classifier endpoint");
    let actuator = Arc::new(BroadcastActuator::new(haptic_tx.clone()));

    let mut controller = Controller::new(
        config.controller_settings(),
        sampler,
        actuator,
        event_tx.clone(),
    );

    #[cfg(target_os = "macos")]
    let hotkey_listener = crate::input::HotkeyListener::new(command_tx.clone());

    #[cfg(target_os = "macos")]
    let input_listener = match hotkey_listener.start() {
        Ok(()) => {
            info!("hotkey listener started");
            true
        }
        Err(e) => {
            error!(?e, "failed to start hotkey listener");
            warn!("continuing with IPC gestures only - check Accessibility permissions");
            false
        }
    };

    #[cfg(not(target_os = "macos"))]
    let input_listener = false;

    let server = Server::new(
        &config.socket_path,
        command_tx,
        DaemonStatus::new(config.speed_wpm.get(), input_listener),
    )?;

    let mut state_rx = event_tx.subscribe();
    let mut haptic_rx = haptic_tx.subscribe();

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the controller (processes gestures and task completions)
        _ = controller.run(command_rx) => {
            info!("controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Keep the IPC status current and relay events + haptics to subscribers
        _ = async {
            loop {
                tokio::select! {
                    event = state_rx.recv() => match event {
                        Ok(event) => {
                            info!(%event, "state event");
                            server.apply_event(&event).await;
                            server.notify(Notification::StateEvent(event));
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "state event receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    command = haptic_rx.recv() => match command {
                        Ok(command) => server.notify(Notification::Haptic(command)),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "haptic command receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        } => {
            info!("event relay exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");

    #[cfg(target_os = "macos")]
    hotkey_listener.stop();
    server.shutdown().await;

    info!("haptic-morse-daemon stopped");

    Ok(())
}

//! Global modifier-key listener using macOS CGEventTap
//!
//! Runs on a dedicated thread with its own CFRunLoop and forwards
//! translated gestures to the controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::keys::{GestureTranslator, ModifierState};
use super::InputEvent;
use crate::state::Command;

/// What the tap callback reports back to the listener loop
enum TapSignal {
    Flags(ModifierState),
    Disabled,
}

/// Global listener that turns modifier key presses into gestures
pub struct HotkeyListener {
    input_tx: mpsc::Sender<Command>,
    running: Arc<AtomicBool>,
}

impl HotkeyListener {
    pub fn new(input_tx: mpsc::Sender<Command>) -> Self {
        Self {
            input_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the listener thread.
    ///
    /// The thread runs until `stop()` is called or the controller's input
    /// channel closes.
    pub fn start(&self) -> Result<(), InputError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(InputError::AlreadyRunning);
        }

        let input_tx = self.input_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");

                if let Err(e) = run_event_loop(input_tx, running.clone()) {
                    error!(?e, "hotkey listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            })
            .map_err(|e| InputError::ThreadSpawn(e.to_string()))?;

        Ok(())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        CFRunLoop::get_main().stop();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("hotkey listener is already running")]
    AlreadyRunning,

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to attach event tap to the run loop")]
    RunLoopSource,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

fn run_event_loop(
    input_tx: mpsc::Sender<Command>,
    running: Arc<AtomicBool>,
) -> Result<(), InputError> {
    let mut translator = GestureTranslator::new();

    let (callback_tx, callback_rx) = std::sync::mpsc::channel::<TapSignal>();

    // Must stay fast and non-blocking
    let callback = move |_proxy: core_graphics::event::CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
          -> Option<CGEvent> {
        match event_type {
            CGEventType::FlagsChanged => {
                let state = ModifierState::from_flags(event.get_flags());
                let _ = callback_tx.send(TapSignal::Flags(state));
            }
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                let _ = callback_tx.send(TapSignal::Disabled);
            }
            _ => {}
        }
        Some(event.clone())
    };

    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::FlagsChanged],
        callback,
    )
    .map_err(|_| InputError::EventTapCreation)?;

    tap.enable();

    let run_loop_source = tap
        .mach_port
        .create_runloop_source(0)
        .map_err(|_| InputError::RunLoopSource)?;
    let run_loop = CFRunLoop::get_current();

    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }

    info!("event tap created and enabled");

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, Duration::from_millis(20), true);
        }

        while let Ok(signal) = callback_rx.try_recv() {
            let events = match signal {
                TapSignal::Flags(state) => translator.translate(state, Instant::now()),
                TapSignal::Disabled => {
                    warn!("event tap disabled, cancelling any active press");
                    translator = GestureTranslator::new();
                    vec![InputEvent::PressCancel]
                }
            };

            for event in events {
                debug!(%event, "gesture from modifier keys");
                if input_tx.blocking_send(event.into()).is_err() {
                    warn!("input channel closed, stopping hotkey listener");
                    return Ok(());
                }
            }
        }
    }

    Ok(())
}

use crate::error::Result;
use crate::session::{HostEvent, SessionKey};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Map a terminal key to the hardware key it stands in for
pub fn map_key(code: KeyCode) -> Option<SessionKey> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => Some(SessionKey::Back),
        KeyCode::Up | KeyCode::Char('+') => Some(SessionKey::VolumeUp),
        KeyCode::Down | KeyCode::Char('-') => Some(SessionKey::VolumeDown),
        KeyCode::Char('f') => Some(SessionKey::Focus),
        KeyCode::Char('c') => Some(SessionKey::Camera),
        KeyCode::Char(c) => Some(SessionKey::Other(c as u32)),
        _ => None,
    }
}

/// Terminal keyboard standing in for hardware keys of a capture session
pub struct KeyboardInputHandler {
    host: mpsc::UnboundedSender<HostEvent>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(host: mpsc::UnboundedSender<HostEvent>) -> Self {
        Self {
            host,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Keyboard input active: ESC/q cancels, UP/DOWN toggle torch, f focus");

        let host = self.host.clone();
        let cancellation_token = self.cancellation_token.clone();

        // Spawn a blocking task to handle keyboard input
        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        if let Ok(Event::Key(key_event)) = event::read() {
                            // Only handle key press events (not release)
                            if key_event.kind != KeyEventKind::Press {
                                continue;
                            }

                            match map_key(key_event.code) {
                                Some(key) => {
                                    debug!("Key {:?} -> {:?}", key_event.code, key);
                                    if host.send(HostEvent::Key(key)).is_err() {
                                        debug!("Session gone, keyboard handler exiting");
                                        break;
                                    }
                                    if key == SessionKey::Back {
                                        break;
                                    }
                                }
                                None => debug!("Key pressed: {:?}", key_event.code),
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Ensure raw mode is disabled even if the task didn't clean up properly
        let _ = disable_raw_mode();

        Ok(())
    }
}

use super::{CaptureCoordinator, ScanOutcome, SessionKey, SessionMessage, SessionState};
use crate::camera::SurfaceHandle;
use crate::config::ScanMode;
use crate::error::{CameraError, SessionError};
use crate::events::ScanEvent;
use tracing::{debug, error, info, warn};

impl CaptureCoordinator {
    /// The session gained the foreground
    pub fn on_foreground(&mut self) {
        if self.state.is_terminal() || matches!(self.state, SessionState::FatalError { .. }) {
            warn!(
                "Session {} cannot resume from state {}",
                self.id, self.state
            );
            return;
        }

        info!("Session {} entering foreground", self.id);
        self.renderer.reset_prompt();
        self.feedback.set_enabled(true);
        self.idle.on_resume();
        if let Some(monitor) = self.orientation.as_mut() {
            monitor.enable();
        }

        match self.surface.filter(|_| self.has_surface) {
            // Surface survived the pause, so no ready signal will come
            Some(surface) => self.init_camera(surface),
            None => {
                self.surface_callbacks = true;
                self.set_state(SessionState::SurfaceWaiting);
            }
        }
    }

    /// The display surface became available
    pub fn on_surface_ready(&mut self, surface: Option<SurfaceHandle>) {
        let Some(surface) = surface else {
            let violation =
                SessionError::PreconditionViolation("surface ready without a handle".to_string());
            warn!("Session {}: {}", self.id, violation);
            return;
        };

        self.has_surface = true;
        self.surface = Some(surface);

        if self.state.is_foreground() {
            self.init_camera(surface);
        } else {
            debug!(
                "Surface {:?} ready while {}, camera stays closed",
                surface, self.state
            );
        }
    }

    pub fn on_surface_destroyed(&mut self) {
        debug!("Session {} lost its display surface", self.id);
        self.has_surface = false;
        self.surface = None;
    }

    /// The session lost the foreground. Scheduled messages are cancelled
    /// before any collaborator is stopped.
    pub fn on_background(&mut self) {
        info!("Session {} entering background", self.id);

        if let Some(monitor) = self.orientation.as_mut() {
            monitor.disable();
        }
        if let Some(dispatch) = self.dispatch.take() {
            dispatch.quit_synchronously();
        }
        self.decoder.cancel();
        self.idle.on_pause();
        self.feedback.release();
        self.camera.close();

        if !self.has_surface {
            self.surface_callbacks = false;
        }

        if self.state.is_foreground() {
            self.set_state(SessionState::Paused);
        }
    }

    /// Final release of everything the session holds
    pub fn on_teardown(&mut self) {
        if let Some(dispatch) = self.dispatch.take() {
            dispatch.quit_synchronously();
        }
        if self.camera.is_open() {
            self.camera.close();
        }
        self.idle.shutdown();

        if !self.state.is_terminal() {
            self.set_state(SessionState::Idle);
        }
        debug!("Session {} torn down", self.id);
    }

    /// Handle a hardware key. Returns true when the key was consumed.
    pub fn on_key(&mut self, key: SessionKey) -> bool {
        match key {
            SessionKey::Back => {
                self.finish(ScanOutcome::Cancelled);
                true
            }
            // Swallowed so they do not reach the host camera application
            SessionKey::Focus | SessionKey::Camera => true,
            SessionKey::VolumeUp => {
                self.set_torch(true);
                true
            }
            SessionKey::VolumeDown => {
                self.set_torch(false);
                true
            }
            SessionKey::Other(code) => {
                debug!("Key {} not handled", code);
                false
            }
        }
    }

    /// The blocking notice shown after a fatal camera error was dismissed
    pub fn on_notice_dismissed(&mut self) {
        if matches!(self.state, SessionState::FatalError { .. }) {
            self.finish(ScanOutcome::Cancelled);
        }
    }

    /// The idle timer expired
    pub fn on_idle_timeout(&mut self) {
        info!("Session {} timed out from inactivity", self.id);
        self.finish(ScanOutcome::Cancelled);
    }

    fn set_torch(&mut self, on: bool) {
        if self.camera.is_open() {
            debug!("Torch {}", if on { "on" } else { "off" });
            self.camera.set_torch(on);
        }
    }

    fn init_camera(&mut self, surface: SurfaceHandle) {
        match self.open_camera(surface) {
            Ok(()) => {}
            Err(SessionError::ReentrantOpen) => {
                warn!(
                    "Session {}: camera opened while already open, late surface callback?",
                    self.id
                );
            }
            Err(SessionError::Camera(err)) => self.fail(err),
            Err(err) => warn!("Session {}: {}", self.id, err),
        }
    }

    fn open_camera(&mut self, surface: SurfaceHandle) -> Result<(), SessionError> {
        if self.camera.is_open() {
            return Err(SessionError::ReentrantOpen);
        }

        self.set_state(SessionState::CameraOpening);
        self.camera.open(surface)?;
        info!("Session {} opened camera on {:?}", self.id, surface);
        self.event_bus.publish(ScanEvent::CameraOpened);

        if self.dispatch.is_none() {
            self.dispatch = Some(self.dispatch_factory.create());
        }
        // Deliver anything that arrived before dispatch existed
        self.results.store(None, self.dispatch.as_deref());

        self.enter_previewing();
        Ok(())
    }

    fn enter_previewing(&mut self) {
        self.set_state(SessionState::Previewing);
        if let Some(dispatch) = &self.dispatch {
            dispatch.post(SessionMessage::Redraw { dirty: None });
        }

        match self.config.mode {
            ScanMode::Continuous => self.decoder.request_decode(),
            ScanMode::SingleShot => self.restart_preview_after_delay(),
        }
    }

    /// Opening the camera failed; never retried within this session
    fn fail(&mut self, err: CameraError) {
        let message = err.to_string();
        error!("Session {} could not open the camera: {}", self.id, message);

        self.event_bus.publish(ScanEvent::CameraOpenFailed {
            error: message.clone(),
        });
        self.set_state(SessionState::FatalError {
            message: message.clone(),
        });
        self.event_bus.publish(ScanEvent::FatalNotice { message });
    }
}

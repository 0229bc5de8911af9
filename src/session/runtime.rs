use super::dispatch::{Envelope, TokioDispatchFactory};
use super::{CaptureCoordinator, ScanOutcome, SessionKey, SessionState};
use crate::camera::SurfaceHandle;
use crate::canvas::Canvas;
use crate::decode::DecodeOutcome;
use crate::error::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events the host environment feeds into a running session
#[derive(Debug)]
pub enum HostEvent {
    Foreground,
    Background,
    SurfaceReady(Option<SurfaceHandle>),
    SurfaceDestroyed,
    Key(SessionKey),
    /// Raw sensor rotation in degrees
    Orientation(i32),
    Decode(DecodeOutcome),
    NoticeDismissed,
    IdleTimeout,
    Teardown,
}

/// Why a single session run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunExit {
    Finished(ScanOutcome),
    Relaunch,
}

/// Cooperative session loop: host events and dispatched messages are
/// handled one at a time on the calling task, drawing into `canvas`.
pub struct SessionRuntime<C: Canvas> {
    host: mpsc::UnboundedReceiver<HostEvent>,
    envelopes_tx: mpsc::UnboundedSender<Envelope>,
    envelopes_rx: mpsc::UnboundedReceiver<Envelope>,
    canvas: C,
    surface: Option<SurfaceHandle>,
    launches: u32,
}

impl<C: Canvas> SessionRuntime<C> {
    pub fn new(host: mpsc::UnboundedReceiver<HostEvent>, canvas: C) -> Self {
        let (envelopes_tx, envelopes_rx) = mpsc::unbounded_channel();
        Self {
            host,
            envelopes_tx,
            envelopes_rx,
            canvas,
            surface: None,
            launches: 0,
        }
    }

    /// Factory whose dispatchers deliver into this runtime
    pub fn dispatch_factory(&self) -> TokioDispatchFactory {
        TokioDispatchFactory::new(self.envelopes_tx.clone())
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn launches(&self) -> u32 {
        self.launches
    }

    /// Run sessions built by `build` until one produces an outcome. A
    /// relaunch builds an identical session and brings it straight back to
    /// the foreground on the last known surface.
    pub async fn launch<F>(&mut self, mut build: F) -> Result<ScanOutcome>
    where
        F: FnMut(TokioDispatchFactory) -> Result<CaptureCoordinator>,
    {
        loop {
            let mut coordinator = build(self.dispatch_factory())?;
            self.launches += 1;

            if self.launches > 1 {
                info!(
                    "Relaunching capture session as {} (launch {})",
                    coordinator.id(),
                    self.launches
                );
                coordinator.on_foreground();
                if self.surface.is_some() {
                    coordinator.on_surface_ready(self.surface);
                }
            }

            match self.run(&mut coordinator).await {
                RunExit::Finished(outcome) => return Ok(outcome),
                RunExit::Relaunch => continue,
            }
        }
    }

    /// Drive one session until it finishes or asks to be relaunched
    pub async fn run(&mut self, coordinator: &mut CaptureCoordinator) -> RunExit {
        info!("Capture session {} running", coordinator.id());

        loop {
            tokio::select! {
                biased;

                event = self.host.recv() => match event {
                    Some(HostEvent::Teardown) | None => {
                        debug!("Host detached from session {}", coordinator.id());
                        Self::shut_down(coordinator);
                        let outcome = coordinator
                            .outcome()
                            .cloned()
                            .unwrap_or(ScanOutcome::Cancelled);
                        return RunExit::Finished(outcome);
                    }
                    Some(event) => self.apply(coordinator, event),
                },

                Some(envelope) = self.envelopes_rx.recv() => {
                    if let Some(message) = envelope.into_live() {
                        coordinator.handle_message(message, &mut self.canvas);
                    }
                }
            }

            match coordinator.state() {
                SessionState::Finished(outcome) => {
                    let outcome = outcome.clone();
                    Self::shut_down(coordinator);
                    return RunExit::Finished(outcome);
                }
                SessionState::Relaunching => {
                    Self::shut_down(coordinator);
                    return RunExit::Relaunch;
                }
                _ => {}
            }
        }
    }

    fn apply(&mut self, coordinator: &mut CaptureCoordinator, event: HostEvent) {
        match event {
            HostEvent::Foreground => coordinator.on_foreground(),
            HostEvent::Background => coordinator.on_background(),
            HostEvent::SurfaceReady(surface) => {
                if surface.is_some() {
                    self.surface = surface;
                }
                coordinator.on_surface_ready(surface);
            }
            HostEvent::SurfaceDestroyed => {
                self.surface = None;
                coordinator.on_surface_destroyed();
            }
            HostEvent::Key(key) => {
                if !coordinator.on_key(key) {
                    debug!("Key {:?} left to the host", key);
                }
            }
            HostEvent::Orientation(degrees) => coordinator.on_orientation(degrees),
            HostEvent::Decode(outcome) => coordinator.on_decode_outcome(outcome),
            HostEvent::NoticeDismissed => coordinator.on_notice_dismissed(),
            HostEvent::IdleTimeout => coordinator.on_idle_timeout(),
            HostEvent::Teardown => warn!("Teardown must be handled by the run loop"),
        }
    }

    fn shut_down(coordinator: &mut CaptureCoordinator) {
        coordinator.on_background();
        coordinator.on_teardown();
    }
}

use super::dispatch::{DispatchFactory, Dispatcher};
use super::mailbox::ResultDispatcher;
use super::orientation::OrientationMonitor;
use super::{DisplayRotation, ScanOutcome, SessionState};
use crate::camera::{CameraResource, SurfaceHandle};
use crate::canvas::RasterImage;
use crate::collaborators::{DecodeWorker, FeedbackSink, IdleTimer};
use crate::config::{OrientationStrategy, ScanMode, SessionConfig};
use crate::events::{EventBus, ScanEvent};
use crate::geometry::{Color, FrameGeometry};
use crate::viewfinder::ViewfinderRenderer;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// External services the coordinator drives, passed in explicitly
pub struct Collaborators {
    pub camera: Box<dyn CameraResource>,
    pub feedback: Box<dyn FeedbackSink>,
    pub idle: Box<dyn IdleTimer>,
    pub decoder: Box<dyn DecodeWorker>,
    pub dispatch: Box<dyn DispatchFactory>,
}

/// Top-level state machine of a capture session.
///
/// All methods run on the single session context. Decode results from the
/// worker enter through [`CaptureCoordinator::on_decode_outcome`] and come
/// back as dispatched messages.
pub struct CaptureCoordinator {
    pub(super) id: Uuid,
    pub(super) config: SessionConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) state: SessionState,

    // Collaborators
    pub(super) camera: Box<dyn CameraResource>,
    pub(super) feedback: Box<dyn FeedbackSink>,
    pub(super) idle: Box<dyn IdleTimer>,
    pub(super) decoder: Box<dyn DecodeWorker>,
    pub(super) dispatch_factory: Box<dyn DispatchFactory>,

    // Owned components
    pub(super) dispatch: Option<Box<dyn Dispatcher>>,
    pub(super) results: ResultDispatcher,
    pub(super) orientation: Option<OrientationMonitor>,
    pub(super) renderer: ViewfinderRenderer,
    pub(super) highlight_color: Color,
    pub(super) last_capture: Option<RasterImage>,

    // Surface lifecycle
    pub(super) has_surface: bool,
    pub(super) surface: Option<SurfaceHandle>,
    pub(super) surface_callbacks: bool,
}

impl CaptureCoordinator {
    pub fn new(
        session: SessionConfig,
        renderer: ViewfinderRenderer,
        rotation: DisplayRotation,
        collaborators: Collaborators,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let id = Uuid::new_v4();
        let highlight_color = renderer.config().highlight_color;

        let orientation = match session.orientation {
            OrientationStrategy::Sensor => Some(OrientationMonitor::new(rotation)),
            OrientationStrategy::Locked => None,
        };

        info!(
            "Capture session {} created (mode: {:?}, orientation: {:?})",
            id, session.mode, session.orientation
        );

        Self {
            id,
            config: session,
            event_bus,
            state: SessionState::Idle,
            camera: collaborators.camera,
            feedback: collaborators.feedback,
            idle: collaborators.idle,
            decoder: collaborators.decoder,
            dispatch_factory: collaborators.dispatch,
            dispatch: None,
            results: ResultDispatcher::new(),
            orientation,
            renderer,
            highlight_color,
            last_capture: None,
            has_surface: false,
            surface: None,
            surface_callbacks: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn mode(&self) -> ScanMode {
        self.config.mode
    }

    /// Terminal outcome, once the session has finished
    pub fn outcome(&self) -> Option<&ScanOutcome> {
        match &self.state {
            SessionState::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn renderer(&self) -> &ViewfinderRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut ViewfinderRenderer {
        &mut self.renderer
    }

    /// Frame of the most recent live scan, with its highlight drawn on
    pub fn last_capture(&self) -> Option<&RasterImage> {
        self.last_capture.as_ref()
    }

    pub fn has_dispatch(&self) -> bool {
        self.dispatch.is_some()
    }

    pub fn has_surface(&self) -> bool {
        self.has_surface
    }

    /// Whether surface lifecycle notifications are still wanted
    pub fn wants_surface_callbacks(&self) -> bool {
        self.surface_callbacks
    }

    pub fn orientation_monitor(&self) -> Option<&OrientationMonitor> {
        self.orientation.as_ref()
    }

    /// Both framing rectangles, once the camera has configured them
    pub fn frame_geometry(&self) -> Option<FrameGeometry> {
        FrameGeometry::from_parts(
            self.camera.framing_rect(),
            self.camera.framing_rect_in_preview(),
        )
    }

    pub(super) fn set_state(&mut self, state: SessionState) {
        if self.state == state {
            return;
        }
        debug!("Session {}: {} -> {}", self.id, self.state, state);
        self.state = state;
        self.event_bus.publish(ScanEvent::StateChanged {
            state: self.state.name().to_string(),
        });
    }

    /// Move to the terminal state and report the outcome
    pub(super) fn finish(&mut self, outcome: ScanOutcome) {
        if self.state.is_terminal() {
            debug!("Session {} already finished, ignoring {:?}", self.id, outcome);
            return;
        }
        info!("Session {} finished with {:?}", self.id, outcome);
        self.set_state(SessionState::Finished(outcome.clone()));
        self.event_bus.publish(ScanEvent::SessionFinished { outcome });
    }
}

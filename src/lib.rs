pub mod camera;
pub mod canvas;
pub mod collaborators;
pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod geometry;
pub mod keyboard_input;
pub mod session;
pub mod simulation;
pub mod viewfinder;

pub use camera::{CameraResource, SimulatedCamera, SurfaceHandle};
pub use canvas::{Canvas, DrawOp, Paint, RasterImage, RecordingCanvas};
pub use collaborators::{DecodeWorker, FeedbackSink, IdleTimer, InactivityTimer, LoggingFeedback};
pub use config::{
    DisplayConfig, LaserStyle, OrientationStrategy, ScanMode, ScancamConfig, SessionConfig,
    ViewfinderConfig,
};
pub use decode::{BarcodeFormat, DecodeOutcome};
pub use error::{CameraError, Result, ScancamError, SessionError};
pub use events::{EventBus, EventFilter, EventReceiver, ScanEvent};
pub use geometry::{Color, FrameGeometry, Rect, ResultPoint};
pub use keyboard_input::KeyboardInputHandler;
pub use session::{
    CaptureCoordinator, Collaborators, DisplayRotation, HostEvent, OrientationMonitor,
    ResultDispatcher, RunExit, ScanOutcome, SessionKey, SessionMessage, SessionRuntime,
    SessionState,
};
pub use simulation::{SimulatedDecodeWorker, SimulationConfig};
pub use viewfinder::{PossiblePointSet, RedrawRequest, ViewfinderRenderer};

//! Capture-session coordination: lifecycle state machine, single-slot result
//! handoff, rotation monitoring and the async loop that hosts a session.

mod coordinator;
mod dispatch;
mod handling;
mod highlight;
mod lifecycle;
mod mailbox;
mod orientation;
mod runtime;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use coordinator::{CaptureCoordinator, Collaborators};
pub use dispatch::{
    DispatchFactory, DispatchLog, Dispatcher, Envelope, Posted, RecordingDispatchFactory,
    RecordingDispatcher, TokioDispatchFactory, TokioDispatcher,
};
pub use highlight::Highlight;
pub use mailbox::ResultDispatcher;
pub use orientation::{OrientationMonitor, RotationBucket};
pub use runtime::{HostEvent, RunExit, SessionRuntime};
pub use state::SessionState;
pub use types::{DisplayRotation, ScanOutcome, SessionKey, SessionMessage};

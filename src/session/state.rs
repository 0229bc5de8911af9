use super::ScanOutcome;
use std::fmt;

/// Lifecycle states of a capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// In the foreground without a display surface yet
    SurfaceWaiting,
    CameraOpening,
    Previewing,
    /// Waiting for a delayed preview restart after a decode
    Restarting,
    Paused,
    Finished(ScanOutcome),
    /// Camera could not be opened; waiting for the notice to be dismissed
    FatalError { message: String },
    /// Torn down for a relaunch with identical parameters
    Relaunching,
}

impl SessionState {
    /// States after which the session accepts no further work
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Finished(_) | SessionState::Relaunching
        )
    }

    /// States in which the session owns the foreground
    pub fn is_foreground(&self) -> bool {
        matches!(
            self,
            SessionState::SurfaceWaiting
                | SessionState::CameraOpening
                | SessionState::Previewing
                | SessionState::Restarting
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::SurfaceWaiting => "surface_waiting",
            SessionState::CameraOpening => "camera_opening",
            SessionState::Previewing => "previewing",
            SessionState::Restarting => "restarting",
            SessionState::Paused => "paused",
            SessionState::Finished(_) => "finished",
            SessionState::FatalError { .. } => "fatal_error",
            SessionState::Relaunching => "relaunching",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

use crate::decode::DecodeOutcome;
use crate::geometry::Rect;
use serde::Serialize;

/// Terminal result handed back to whoever launched the capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Success { text: String },
    Cancelled,
}

/// Hardware keys the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey {
    Back,
    Focus,
    Camera,
    VolumeUp,
    VolumeDown,
    Other(u32),
}

/// Messages delivered through the dispatch context to the session loop
#[derive(Debug)]
pub enum SessionMessage {
    DecodeSucceeded(DecodeOutcome),
    RestartPreview,
    /// Redraw the overlay, confined to `dirty` when given
    Redraw { dirty: Option<Rect> },
}

impl SessionMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionMessage::DecodeSucceeded(_) => "decode_succeeded",
            SessionMessage::RestartPreview => "restart_preview",
            SessionMessage::Redraw { .. } => "redraw",
        }
    }
}

/// Rotation of the display relative to its natural orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScancamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Failures reported by the camera hardware layer when opening the driver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Camera driver I/O error: {details}")]
    DriverIo { details: String },

    #[error("Camera hardware runtime fault: {details}")]
    HardwareRuntime { details: String },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to load asset '{path}': {details}")]
    AssetLoad { path: String, details: String },

    #[error("Failed to load font '{path}': {details}")]
    FontLoad { path: String, details: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventBusError {
    #[error("Event bus channel closed")]
    ChannelClosed,

    #[error("Receiver lagged behind by {skipped} events")]
    Lagged { skipped: u64 },
}

/// Errors local to the capture coordinator. These never cross the
/// coordinator boundary; the outcome channel only sees success or cancel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Camera open attempted while already open")]
    ReentrantOpen,

    #[error(transparent)]
    Camera(#[from] CameraError),
}

impl ScancamError {
    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScancamError>;

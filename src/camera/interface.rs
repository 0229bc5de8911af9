use crate::error::CameraError;
use crate::geometry::Rect;

/// Opaque handle to the display surface the camera previews into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Exclusive camera hardware handle.
///
/// The framing rectangles stay `None` until the driver has been opened and
/// configured.
pub trait CameraResource: Send {
    fn open(&mut self, surface: SurfaceHandle) -> Result<(), CameraError>;

    fn is_open(&self) -> bool;

    fn close(&mut self);

    fn set_torch(&mut self, on: bool);

    /// Active scan region in display coordinates
    fn framing_rect(&self) -> Option<Rect>;

    /// Active scan region in preview/sensor coordinates
    fn framing_rect_in_preview(&self) -> Option<Rect>;
}

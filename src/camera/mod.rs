mod interface;
mod simulated;
#[cfg(test)]
mod tests;

pub use interface::{CameraResource, SurfaceHandle};
pub use simulated::{SimulatedCamera, SimulatedCameraState};

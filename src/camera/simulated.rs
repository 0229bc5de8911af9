use super::interface::{CameraResource, SurfaceHandle};
use crate::config::DisplayConfig;
use crate::error::CameraError;
use crate::geometry::Rect;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

const MIN_FRAME_WIDTH: u32 = 240;
const MIN_FRAME_HEIGHT: u32 = 240;
const MAX_FRAME_WIDTH: u32 = 1200;
const MAX_FRAME_HEIGHT: u32 = 675;

/// Observable state of a simulated camera, shared with test and demo code
#[derive(Debug, Default)]
pub struct SimulatedCameraState {
    pub open: bool,
    pub torch: bool,
    pub open_calls: u32,
    pub close_calls: u32,
    pub surface: Option<SurfaceHandle>,
    /// Error returned by the next `open` call
    pub fail_next_open: Option<CameraError>,
}

/// Camera that needs no hardware: geometry is derived from the configured
/// display and preview resolutions
pub struct SimulatedCamera {
    display: DisplayConfig,
    state: Arc<Mutex<SimulatedCameraState>>,
}

impl SimulatedCamera {
    pub fn new(display: DisplayConfig) -> Self {
        Self {
            display,
            state: Arc::new(Mutex::new(SimulatedCameraState::default())),
        }
    }

    /// Shared view of the camera state
    pub fn state(&self) -> Arc<Mutex<SimulatedCameraState>> {
        Arc::clone(&self.state)
    }

    /// Make the next `open` fail with `error`
    pub fn fail_next_open(&self, error: CameraError) {
        self.state.lock().fail_next_open = Some(error);
    }

    fn screen_framing_rect(&self) -> Rect {
        let (screen_width, screen_height) = self.display.resolution;
        let width = desired_dimension(screen_width, MIN_FRAME_WIDTH, MAX_FRAME_WIDTH);
        let height = desired_dimension(screen_height, MIN_FRAME_HEIGHT, MAX_FRAME_HEIGHT);

        let left = (screen_width.saturating_sub(width) / 2) as i32;
        let top = (screen_height.saturating_sub(height) / 2) as i32;
        Rect::new(left, top, left + width as i32, top + height as i32)
    }

    fn preview_framing_rect(&self) -> Rect {
        let rect = self.screen_framing_rect();
        let (screen_width, screen_height) = self.display.resolution;
        let (preview_width, preview_height) = self.display.preview_resolution;

        let scale_x = |v: i32| (v as i64 * preview_width as i64 / screen_width as i64) as i32;
        let scale_y = |v: i32| (v as i64 * preview_height as i64 / screen_height as i64) as i32;

        Rect::new(
            scale_x(rect.left),
            scale_y(rect.top),
            scale_x(rect.right),
            scale_y(rect.bottom),
        )
    }
}

/// Five eighths of the screen dimension, clamped to the hard limits
fn desired_dimension(resolution: u32, hard_min: u32, hard_max: u32) -> u32 {
    let dim = 5 * resolution / 8;
    dim.clamp(hard_min, hard_max).min(resolution)
}

impl CameraResource for SimulatedCamera {
    fn open(&mut self, surface: SurfaceHandle) -> Result<(), CameraError> {
        let mut state = self.state.lock();
        state.open_calls += 1;

        if let Some(error) = state.fail_next_open.take() {
            debug!("Simulated camera open failing with: {}", error);
            return Err(error);
        }

        state.open = true;
        state.surface = Some(surface);
        info!(
            "Simulated camera opened on surface {:?} ({}x{} preview)",
            surface, self.display.preview_resolution.0, self.display.preview_resolution.1
        );
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if state.open {
            debug!("Simulated camera closed");
        }
        state.close_calls += 1;
        state.open = false;
        state.torch = false;
        state.surface = None;
    }

    fn set_torch(&mut self, on: bool) {
        let mut state = self.state.lock();
        if state.open {
            state.torch = on;
            debug!("Torch {}", if on { "on" } else { "off" });
        }
    }

    fn framing_rect(&self) -> Option<Rect> {
        self.is_open().then(|| self.screen_framing_rect())
    }

    fn framing_rect_in_preview(&self) -> Option<Rect> {
        self.is_open().then(|| self.preview_framing_rect())
    }
}

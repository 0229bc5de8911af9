use super::*;
use crate::config::DisplayConfig;
use crate::error::CameraError;
use crate::geometry::Rect;

fn create_test_display_config() -> DisplayConfig {
    DisplayConfig {
        resolution: (480, 800),
        preview_resolution: (640, 480),
    }
}

#[test]
fn test_geometry_unavailable_until_open() {
    let camera = SimulatedCamera::new(create_test_display_config());

    assert!(!camera.is_open());
    assert!(camera.framing_rect().is_none());
    assert!(camera.framing_rect_in_preview().is_none());
}

#[test]
fn test_framing_rects_after_open() {
    let mut camera = SimulatedCamera::new(create_test_display_config());
    camera.open(SurfaceHandle(1)).unwrap();

    assert_eq!(camera.framing_rect(), Some(Rect::new(90, 150, 390, 650)));
    assert_eq!(
        camera.framing_rect_in_preview(),
        Some(Rect::new(120, 90, 520, 390))
    );
}

#[test]
fn test_frame_is_clamped_to_minimum() {
    let mut camera = SimulatedCamera::new(DisplayConfig {
        resolution: (320, 320),
        preview_resolution: (320, 320),
    });
    camera.open(SurfaceHandle(1)).unwrap();

    let frame = camera.framing_rect().unwrap();
    assert_eq!(frame.width(), 240);
    assert_eq!(frame.height(), 240);
    assert_eq!(frame.left, 40);
}

#[test]
fn test_injected_open_failure() {
    let mut camera = SimulatedCamera::new(create_test_display_config());
    camera.fail_next_open(CameraError::DriverIo {
        details: "busy".to_string(),
    });

    assert!(camera.open(SurfaceHandle(1)).is_err());
    assert!(!camera.is_open());

    // Failure is one-shot
    assert!(camera.open(SurfaceHandle(1)).is_ok());
    assert_eq!(camera.state().lock().open_calls, 2);
}

#[test]
fn test_torch_requires_open_camera() {
    let mut camera = SimulatedCamera::new(create_test_display_config());
    let state = camera.state();

    camera.set_torch(true);
    assert!(!state.lock().torch);

    camera.open(SurfaceHandle(3)).unwrap();
    camera.set_torch(true);
    assert!(state.lock().torch);

    camera.close();
    assert!(!state.lock().torch);
    assert!(!state.lock().open);
}

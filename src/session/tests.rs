use super::*;
use crate::camera::{SimulatedCamera, SimulatedCameraState, SurfaceHandle};
use crate::canvas::{DrawOp, RasterImage, RecordingCanvas};
use crate::collaborators::{DecodeWorker, FeedbackSink, IdleTimer};
use crate::config::{DisplayConfig, OrientationStrategy, ScanMode, SessionConfig, ViewfinderConfig};
use crate::decode::{BarcodeFormat, DecodeOutcome};
use crate::error::CameraError;
use crate::events::{EventBus, EventFilter, EventReceiver, ScanEvent};
use crate::geometry::{Color, ResultPoint};
use crate::viewfinder::ViewfinderRenderer;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Names of collaborator calls, in order
#[derive(Debug, Default)]
struct CallLog(Mutex<Vec<&'static str>>);

impl CallLog {
    fn record(&self, call: &'static str) {
        self.0.lock().push(call);
    }

    fn count(&self, call: &str) -> usize {
        self.0.lock().iter().filter(|c| **c == call).count()
    }

    fn position(&self, call: &str) -> Option<usize> {
        self.0.lock().iter().position(|c| *c == call)
    }
}

/// Recording dispatch factory whose dispatchers also log their quit
struct QuitLoggingFactory {
    inner: RecordingDispatchFactory,
    calls: Arc<CallLog>,
}

impl DispatchFactory for QuitLoggingFactory {
    fn create(&mut self) -> Box<dyn Dispatcher> {
        Box::new(QuitLoggingDispatcher {
            inner: self.inner.create(),
            calls: Arc::clone(&self.calls),
        })
    }
}

struct QuitLoggingDispatcher {
    inner: Box<dyn Dispatcher>,
    calls: Arc<CallLog>,
}

impl Dispatcher for QuitLoggingDispatcher {
    fn post(&self, message: SessionMessage) {
        self.inner.post(message);
    }

    fn post_delayed(&self, message: SessionMessage, delay: Duration) {
        self.inner.post_delayed(message, delay);
    }

    fn quit_synchronously(&self) {
        self.calls.record("quit");
        self.inner.quit_synchronously();
    }
}

struct FakeFeedback {
    calls: Arc<CallLog>,
    enabled: bool,
}

impl FeedbackSink for FakeFeedback {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.calls.record("set_enabled");
    }

    fn play_feedback(&mut self) {
        if self.enabled {
            self.calls.record("play");
        }
    }

    fn release(&mut self) {
        self.calls.record("release");
    }
}

struct FakeIdle {
    calls: Arc<CallLog>,
}

impl IdleTimer for FakeIdle {
    fn on_resume(&mut self) {
        self.calls.record("resume");
    }

    fn on_pause(&mut self) {
        self.calls.record("pause");
    }

    fn on_activity(&mut self) {
        self.calls.record("activity");
    }

    fn shutdown(&mut self) {
        self.calls.record("shutdown");
    }
}

struct FakeDecoder {
    calls: Arc<CallLog>,
}

impl DecodeWorker for FakeDecoder {
    fn request_decode(&mut self) {
        self.calls.record("request");
    }

    fn cancel(&mut self) {
        self.calls.record("cancel");
    }
}

struct Harness {
    coordinator: CaptureCoordinator,
    camera: Arc<Mutex<SimulatedCameraState>>,
    calls: Arc<CallLog>,
    dispatch: RecordingDispatchFactory,
    events: EventReceiver,
    canvas: RecordingCanvas,
}

impl Harness {
    fn new(mode: ScanMode, orientation: OrientationStrategy) -> Self {
        Self::with_camera(mode, orientation, |_| {})
    }

    fn with_camera<F>(mode: ScanMode, orientation: OrientationStrategy, setup: F) -> Self
    where
        F: FnOnce(&SimulatedCamera),
    {
        let camera = SimulatedCamera::new(DisplayConfig::default());
        setup(&camera);
        let camera_state = camera.state();

        let calls = Arc::new(CallLog::default());
        let dispatch = RecordingDispatchFactory::new();
        let event_bus = Arc::new(EventBus::new(128));
        let events = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::All,
            "session-test".to_string(),
        );

        let session = SessionConfig {
            mode,
            orientation,
            ..SessionConfig::default()
        };
        let renderer = ViewfinderRenderer::new(ViewfinderConfig::default()).unwrap();
        let collaborators = Collaborators {
            camera: Box::new(camera),
            feedback: Box::new(FakeFeedback {
                calls: Arc::clone(&calls),
                enabled: false,
            }),
            idle: Box::new(FakeIdle {
                calls: Arc::clone(&calls),
            }),
            decoder: Box::new(FakeDecoder {
                calls: Arc::clone(&calls),
            }),
            dispatch: Box::new(QuitLoggingFactory {
                inner: dispatch.clone(),
                calls: Arc::clone(&calls),
            }),
        };

        let coordinator = CaptureCoordinator::new(
            session,
            renderer,
            DisplayRotation::Rotation0,
            collaborators,
            event_bus,
        );

        Self {
            coordinator,
            camera: camera_state,
            calls,
            dispatch,
            events,
            canvas: RecordingCanvas::new(480, 800),
        }
    }

    fn start(&mut self) {
        self.coordinator.on_foreground();
        self.coordinator.on_surface_ready(Some(SurfaceHandle(1)));
    }

    /// Deliver every queued message except overlay redraws
    fn deliver(&mut self) -> usize {
        let mut delivered = 0;
        for posted in self.dispatch.take_posted() {
            if matches!(posted.message, SessionMessage::Redraw { .. }) {
                continue;
            }
            self.coordinator.handle_message(posted.message, &mut self.canvas);
            delivered += 1;
        }
        delivered
    }

    fn pending_restarts(&self) -> Vec<Option<Duration>> {
        self.dispatch
            .log()
            .lock()
            .posted
            .iter()
            .filter(|posted| matches!(posted.message, SessionMessage::RestartPreview))
            .map(|posted| posted.delay)
            .collect()
    }
}

fn live_outcome(text: &str, points: Vec<Option<ResultPoint>>) -> DecodeOutcome {
    DecodeOutcome::new(text, BarcodeFormat::Code128)
        .with_points(points)
        .with_raster(RasterImage::new(100, 100), 1.0)
}

fn failed_outcome() -> DecodeOutcome {
    DecodeOutcome::failed(RasterImage::new(100, 100))
}

#[test]
fn test_surface_ready_opens_camera_and_starts_preview() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.coordinator.on_foreground();
    assert_eq!(harness.coordinator.state(), &SessionState::SurfaceWaiting);
    assert!(harness.coordinator.wants_surface_callbacks());

    harness.coordinator.on_surface_ready(Some(SurfaceHandle(1)));

    assert_eq!(harness.coordinator.state(), &SessionState::Previewing);
    assert!(harness.camera.lock().open);
    assert!(harness.coordinator.has_dispatch());
    assert!(harness.coordinator.frame_geometry().is_some());
    assert_eq!(harness.dispatch.log().lock().created, 1);
    assert_eq!(harness.calls.count("request"), 1);
    assert_eq!(harness.calls.count("resume"), 1);

    let posted = harness.dispatch.take_posted();
    assert_eq!(posted.len(), 1);
    assert!(matches!(
        posted[0].message,
        SessionMessage::Redraw { dirty: None }
    ));

    let events = harness.events.drain();
    assert!(events.contains(&ScanEvent::CameraOpened));
}

#[test]
fn test_result_slot_keeps_only_latest() {
    let slot = ResultDispatcher::new();
    let mut factory = RecordingDispatchFactory::new();

    assert!(!slot.store(Some(live_outcome("A", vec![])), None));
    assert!(!slot.store(Some(live_outcome("B", vec![])), None));
    assert!(!slot.is_empty());

    let dispatcher = factory.create();
    assert!(slot.store(None, Some(dispatcher.as_ref())));
    assert!(slot.is_empty());

    let posted = factory.take_posted();
    assert_eq!(posted.len(), 1);
    match &posted[0].message {
        SessionMessage::DecodeSucceeded(outcome) => assert_eq!(outcome.text, "B"),
        other => panic!("unexpected message: {:?}", other),
    }

    // Nothing left to deliver on a later empty store
    assert!(!slot.store(None, Some(dispatcher.as_ref())));
}

#[test]
fn test_result_slot_delivers_immediately_with_dispatch() {
    let slot = ResultDispatcher::new();
    let mut factory = RecordingDispatchFactory::new();
    let dispatcher = factory.create();

    assert!(slot.store(Some(live_outcome("C", vec![])), Some(dispatcher.as_ref())));
    assert!(slot.is_empty());
    assert_eq!(factory.take_posted().len(), 1);
}

#[test]
fn test_result_before_dispatch_is_flushed_on_open() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.coordinator.on_foreground();
    harness.coordinator.on_decode_outcome(live_outcome("A", vec![]));
    harness.coordinator.on_decode_outcome(live_outcome("B", vec![]));
    assert!(harness.dispatch.log().lock().posted.is_empty());

    harness.coordinator.on_surface_ready(Some(SurfaceHandle(1)));
    assert_eq!(harness.deliver(), 1);

    assert_eq!(
        harness.coordinator.outcome(),
        Some(&ScanOutcome::Success {
            text: "B".to_string()
        })
    );
}

#[test]
fn test_live_scan_success_in_continuous_mode() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();
    harness.dispatch.take_posted();
    harness.events.drain();

    harness.coordinator.on_decode_outcome(live_outcome(
        "ABC123",
        vec![
            Some(ResultPoint::new(10.0, 50.0)),
            Some(ResultPoint::new(90.0, 50.0)),
        ],
    ));
    assert_eq!(harness.deliver(), 1);

    assert_eq!(harness.calls.count("play"), 1);
    assert_eq!(harness.calls.count("activity"), 1);
    assert_eq!(
        harness.coordinator.outcome(),
        Some(&ScanOutcome::Success {
            text: "ABC123".to_string()
        })
    );
    assert!(harness.pending_restarts().is_empty());
    assert!(harness.coordinator.last_capture().is_some());

    let events = harness.events.drain();
    assert!(events.contains(&ScanEvent::HighlightDrawn { lines: 1, dots: 0 }));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ScanEvent::SessionFinished { .. }))
            .count(),
        1
    );
    assert!(!events
        .iter()
        .any(|e| matches!(e, ScanEvent::RestartScheduled { .. })));
}

#[test]
fn test_highlight_is_drawn_onto_captured_frame() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();

    harness.coordinator.on_decode_outcome(live_outcome(
        "LINE",
        vec![
            Some(ResultPoint::new(10.0, 50.0)),
            Some(ResultPoint::new(90.0, 50.0)),
        ],
    ));
    harness.deliver();

    let capture = harness.coordinator.last_capture().unwrap();
    assert_ne!(capture.pixel(50, 50).alpha(), 0);
    assert_eq!(capture.pixel(50, 10).alpha(), 0);
}

#[test]
fn test_failed_live_scan_schedules_one_restart() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();
    harness.dispatch.take_posted();
    harness.coordinator.renderer_mut().hide_prompt();

    harness.coordinator.on_decode_outcome(failed_outcome());
    harness.deliver();

    assert!(harness.coordinator.outcome().is_none());
    assert_eq!(harness.calls.count("play"), 1);
    assert_eq!(
        harness.pending_restarts(),
        vec![Some(Duration::from_millis(500))]
    );
    assert_eq!(harness.coordinator.state(), &SessionState::Restarting);
    assert!(harness.coordinator.renderer().prompt().is_some());

    // The restart resumes decoding
    harness.deliver();
    assert_eq!(harness.coordinator.state(), &SessionState::Previewing);
    assert_eq!(harness.calls.count("request"), 2);
    assert!(harness
        .events
        .drain()
        .contains(&ScanEvent::PreviewRestarted));
}

#[test]
fn test_continuous_mode_ignores_outcome_without_frame() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();

    harness
        .coordinator
        .on_decode_outcome(DecodeOutcome::new("HISTORY", BarcodeFormat::QrCode));
    harness.deliver();

    assert_eq!(harness.calls.count("play"), 0);
    assert!(harness.coordinator.outcome().is_none());
    assert!(harness.pending_restarts().is_empty());
    assert_eq!(harness.coordinator.state(), &SessionState::Previewing);
}

#[test]
fn test_single_shot_restarts_on_entry_and_ends_on_text() {
    let mut harness = Harness::new(ScanMode::SingleShot, OrientationStrategy::Locked);
    harness.start();

    assert_eq!(harness.coordinator.state(), &SessionState::Restarting);
    assert_eq!(
        harness.pending_restarts(),
        vec![Some(Duration::from_millis(500))]
    );
    harness.deliver();
    assert_eq!(harness.coordinator.state(), &SessionState::Previewing);

    // No live frame needed to finish
    harness
        .coordinator
        .on_decode_outcome(DecodeOutcome::new("ONE", BarcodeFormat::QrCode));
    harness.deliver();

    assert_eq!(harness.calls.count("play"), 0);
    assert_eq!(
        harness.coordinator.outcome(),
        Some(&ScanOutcome::Success {
            text: "ONE".to_string()
        })
    );
}

#[test]
fn test_single_shot_failure_without_frame_restarts() {
    let mut harness = Harness::new(ScanMode::SingleShot, OrientationStrategy::Locked);
    harness.start();
    harness.deliver();

    harness
        .coordinator
        .on_decode_outcome(DecodeOutcome::new("", BarcodeFormat::QrCode));
    harness.deliver();

    // The on-entry restart was already delivered; this one is new
    assert_eq!(harness.pending_restarts().len(), 1);
    assert!(harness.coordinator.outcome().is_none());
}

#[test]
fn test_camera_failure_is_fatal_until_dismissed() {
    let mut harness = Harness::with_camera(
        ScanMode::Continuous,
        OrientationStrategy::Locked,
        |camera| {
            camera.fail_next_open(CameraError::DriverIo {
                details: "busy".to_string(),
            })
        },
    );
    harness.start();

    assert!(matches!(
        harness.coordinator.state(),
        SessionState::FatalError { .. }
    ));
    assert!(!harness.coordinator.has_dispatch());

    let events = harness.events.drain();
    assert!(events
        .iter()
        .any(|e| matches!(e, ScanEvent::CameraOpenFailed { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, ScanEvent::FatalNotice { .. })));

    // Never retried within the session
    harness.coordinator.on_surface_ready(Some(SurfaceHandle(2)));
    harness.coordinator.on_foreground();
    assert_eq!(harness.camera.lock().open_calls, 1);

    harness.coordinator.on_notice_dismissed();
    assert_eq!(harness.coordinator.outcome(), Some(&ScanOutcome::Cancelled));
}

#[test]
fn test_reentrant_open_is_ignored() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();

    harness.coordinator.on_surface_ready(Some(SurfaceHandle(2)));

    assert_eq!(harness.camera.lock().open_calls, 1);
    assert_eq!(harness.coordinator.state(), &SessionState::Previewing);
    assert_eq!(harness.dispatch.log().lock().created, 1);
}

#[test]
fn test_null_surface_is_ignored() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.coordinator.on_foreground();

    harness.coordinator.on_surface_ready(None);

    assert_eq!(harness.coordinator.state(), &SessionState::SurfaceWaiting);
    assert!(!harness.coordinator.has_surface());
    assert_eq!(harness.camera.lock().open_calls, 0);
}

#[test]
fn test_keys() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);

    // Torch needs an open camera
    assert!(harness.coordinator.on_key(SessionKey::VolumeUp));
    assert!(!harness.camera.lock().torch);

    harness.start();
    assert!(harness.coordinator.on_key(SessionKey::VolumeUp));
    assert!(harness.camera.lock().torch);
    assert!(harness.coordinator.on_key(SessionKey::VolumeDown));
    assert!(!harness.camera.lock().torch);

    assert!(harness.coordinator.on_key(SessionKey::Focus));
    assert!(harness.coordinator.on_key(SessionKey::Camera));
    assert!(!harness.coordinator.on_key(SessionKey::Other(42)));
    assert!(harness.coordinator.outcome().is_none());

    assert!(harness.coordinator.on_key(SessionKey::Back));
    assert_eq!(harness.coordinator.outcome(), Some(&ScanOutcome::Cancelled));
}

#[test]
fn test_background_quiesces_before_stopping_collaborators() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();
    harness.coordinator.on_decode_outcome(failed_outcome());
    harness.deliver();
    assert_eq!(harness.pending_restarts().len(), 1);

    harness.coordinator.on_background();

    {
        let log = harness.dispatch.log();
        let log = log.lock();
        assert_eq!(log.quits, 1);
        assert!(log.posted.is_empty());
    }
    assert!(!harness.coordinator.has_dispatch());
    assert!(!harness.camera.lock().open);
    assert_eq!(harness.calls.count("quit"), 1);
    // Scheduled messages are cancelled before anything is stopped
    let order = ["quit", "cancel", "pause", "release"].map(|call| harness.calls.position(call));
    assert!(order.iter().all(Option::is_some));
    assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(harness.calls.count("cancel"), 1);
    assert_eq!(harness.calls.count("pause"), 1);
    assert_eq!(harness.calls.count("release"), 1);
    assert_eq!(harness.coordinator.state(), &SessionState::Paused);

    // Surface survived, so resuming reopens straight away
    harness.coordinator.on_foreground();
    assert_eq!(harness.coordinator.state(), &SessionState::Previewing);
    assert_eq!(harness.camera.lock().open_calls, 2);
    assert_eq!(harness.dispatch.log().lock().created, 2);
}

#[test]
fn test_background_without_surface_drops_surface_callbacks() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.coordinator.on_foreground();
    assert!(harness.coordinator.wants_surface_callbacks());

    harness.coordinator.on_background();
    assert!(!harness.coordinator.wants_surface_callbacks());
    assert_eq!(harness.coordinator.state(), &SessionState::Paused);
}

#[test]
fn test_surface_destroyed_requires_new_surface() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();
    harness.coordinator.on_background();
    harness.coordinator.on_surface_destroyed();

    harness.coordinator.on_foreground();
    assert_eq!(harness.coordinator.state(), &SessionState::SurfaceWaiting);
    assert_eq!(harness.camera.lock().open_calls, 1);
}

#[test]
fn test_redraw_loop_reschedules_itself() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();
    let mut posted = harness.dispatch.take_posted();
    let first = posted.remove(0);

    harness
        .coordinator
        .handle_message(first.message, &mut harness.canvas);

    assert_eq!(
        &harness.canvas.ops()[..2],
        &[
            DrawOp::Clip { region: None },
            DrawOp::Clear { region: None }
        ]
    );
    assert_eq!(
        harness.canvas.ops().last(),
        Some(&DrawOp::Clip { region: None })
    );
    let frame = harness.coordinator.frame_geometry().unwrap().frame;
    let next = harness.dispatch.take_posted();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].delay, Some(Duration::from_millis(80)));
    match next[0].message {
        SessionMessage::Redraw { dirty } => assert_eq!(dirty, Some(frame.expanded(6))),
        ref other => panic!("unexpected message: {:?}", other),
    }

    // A hidden session stops the loop
    harness.coordinator.on_background();
    harness.canvas.take_ops();
    harness.coordinator.handle_message(
        SessionMessage::Redraw { dirty: None },
        &mut harness.canvas,
    );
    assert!(harness.canvas.ops().is_empty());
}

#[test]
fn test_partial_redraws_keep_mask_translucent() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();
    harness.dispatch.take_posted();

    let mask = ViewfinderConfig::default().mask_color;
    let mut display = RasterImage::new(480, 800);
    let mut message = SessionMessage::Redraw { dirty: None };

    for _ in 0..11 {
        harness.coordinator.handle_message(message, &mut display);
        assert_eq!(display.pixel(5, 5), mask);
        assert_eq!(display.pixel(5, 795), mask);

        let mut posted = harness.dispatch.take_posted();
        assert_eq!(posted.len(), 1);
        message = posted.remove(0).message;
        assert!(matches!(message, SessionMessage::Redraw { dirty: Some(_) }));
    }
}

#[test]
fn test_idle_timeout_and_teardown() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();

    harness.coordinator.on_idle_timeout();
    assert_eq!(harness.coordinator.outcome(), Some(&ScanOutcome::Cancelled));

    harness.coordinator.on_teardown();
    assert_eq!(harness.calls.count("shutdown"), 1);
    assert!(!harness.camera.lock().open);
    assert_eq!(harness.coordinator.outcome(), Some(&ScanOutcome::Cancelled));

    let mut idle = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    idle.start();
    idle.coordinator.on_teardown();
    assert_eq!(idle.coordinator.state(), &SessionState::Idle);
}

#[test]
fn test_orientation_flip_relaunches_and_discards_pending_result() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Sensor);
    harness.coordinator.on_foreground();
    assert!(harness
        .coordinator
        .orientation_monitor()
        .unwrap()
        .is_enabled());

    // Held in the slot: no dispatch context yet
    harness.coordinator.on_decode_outcome(live_outcome("LATE", vec![]));
    harness.events.drain();

    harness.coordinator.on_orientation(90);
    assert_eq!(harness.coordinator.state(), &SessionState::SurfaceWaiting);

    harness.coordinator.on_orientation(270);
    assert_eq!(harness.coordinator.state(), &SessionState::Relaunching);

    let events = harness.events.drain();
    assert!(events.contains(&ScanEvent::PendingResultDiscarded {
        text: "LATE".to_string()
    }));
    assert!(events.contains(&ScanEvent::RelaunchRequested));

    // The relaunched session receives nothing from this one
    harness.coordinator.on_surface_ready(Some(SurfaceHandle(1)));
    assert_eq!(harness.deliver(), 0);
}

#[test]
fn test_locked_orientation_never_relaunches() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();
    assert!(harness.coordinator.orientation_monitor().is_none());

    harness.coordinator.on_orientation(90);
    harness.coordinator.on_orientation(270);
    assert_eq!(harness.coordinator.state(), &SessionState::Previewing);
}

#[test]
fn test_rotation_classification() {
    assert_eq!(RotationBucket::classify(45), RotationBucket::None);
    assert_eq!(RotationBucket::classify(46), RotationBucket::Ninety);
    assert_eq!(RotationBucket::classify(134), RotationBucket::Ninety);
    assert_eq!(RotationBucket::classify(135), RotationBucket::None);
    assert_eq!(RotationBucket::classify(180), RotationBucket::None);
    assert_eq!(RotationBucket::classify(270), RotationBucket::TwoSeventy);
    assert_eq!(RotationBucket::classify(315), RotationBucket::None);
    assert_eq!(RotationBucket::classify(0), RotationBucket::None);
    assert_eq!(RotationBucket::classify(-1), RotationBucket::None);
}

#[test]
fn test_half_turn_triggers_exactly_one_restart() {
    let mut monitor = OrientationMonitor::new(DisplayRotation::Rotation0);
    monitor.enable();

    let restarts = [90, 270]
        .iter()
        .filter(|degrees| monitor.on_orientation(**degrees))
        .count();
    assert_eq!(restarts, 1);
    assert_eq!(monitor.last(), RotationBucket::TwoSeventy);
}

#[test]
fn test_passing_through_upright_does_not_restart() {
    let mut monitor = OrientationMonitor::new(DisplayRotation::Rotation0);
    monitor.enable();

    let restarts = [90, 0, 90]
        .iter()
        .filter(|degrees| monitor.on_orientation(**degrees))
        .count();
    assert_eq!(restarts, 0);
    assert_eq!(monitor.last(), RotationBucket::Ninety);
}

#[test]
fn test_monitor_seeded_from_display_rotation() {
    let mut monitor = OrientationMonitor::new(DisplayRotation::Rotation90);
    assert_eq!(monitor.last(), RotationBucket::TwoSeventy);

    // Disabled monitors ignore readings
    assert!(!monitor.on_orientation(90));

    monitor.enable();
    assert!(monitor.on_orientation(90));

    let monitor = OrientationMonitor::new(DisplayRotation::Rotation270);
    assert_eq!(monitor.last(), RotationBucket::Ninety);
}

#[test]
fn test_highlight_two_points_draw_a_line() {
    let points = [
        Some(ResultPoint::new(1.0, 2.0)),
        Some(ResultPoint::new(3.0, 4.0)),
    ];
    let highlight = Highlight::plan(&points, BarcodeFormat::Code128, 2.0);
    assert_eq!(highlight, Highlight::Line(((2.0, 4.0), (6.0, 8.0))));

    let mut canvas = RecordingCanvas::new(10, 10);
    highlight.render(&mut canvas, Color::WHITE);
    assert_eq!(
        canvas.ops(),
        &[DrawOp::Line {
            from: (2.0, 4.0),
            to: (6.0, 8.0),
            color: Color::WHITE,
            stroke_width: 4.0,
        }]
    );
}

#[test]
fn test_two_points_with_missing_end_draw_nothing() {
    for points in [
        [Some(ResultPoint::new(1.0, 2.0)), None],
        [None, Some(ResultPoint::new(1.0, 2.0))],
        [None, None],
    ] {
        let highlight = Highlight::plan(&points, BarcodeFormat::Code128, 1.0);
        assert_eq!(highlight, Highlight::None);
        assert_eq!(highlight.counts(), (0, 0));
    }
}

#[test]
fn test_live_scan_with_broken_line_publishes_no_highlight() {
    let mut harness = Harness::new(ScanMode::Continuous, OrientationStrategy::Locked);
    harness.start();
    harness.events.drain();

    harness.coordinator.on_decode_outcome(live_outcome(
        "HALF",
        vec![Some(ResultPoint::new(10.0, 50.0)), None],
    ));
    harness.deliver();

    let events = harness.events.drain();
    assert!(events.contains(&ScanEvent::FeedbackPlayed));
    assert!(!events
        .iter()
        .any(|e| matches!(e, ScanEvent::HighlightDrawn { .. })));
    let capture = harness.coordinator.last_capture().unwrap();
    assert_eq!(capture.pixel(10, 50).alpha(), 0);
}

#[test]
fn test_highlight_retail_pairs() {
    let points = [
        Some(ResultPoint::new(0.0, 0.0)),
        Some(ResultPoint::new(1.0, 0.0)),
        Some(ResultPoint::new(2.0, 0.0)),
        Some(ResultPoint::new(3.0, 0.0)),
    ];
    for format in [BarcodeFormat::UpcA, BarcodeFormat::Ean13] {
        let highlight = Highlight::plan(&points, format, 1.0);
        assert_eq!(
            highlight,
            Highlight::Lines(vec![((0.0, 0.0), (1.0, 0.0)), ((2.0, 0.0), (3.0, 0.0))])
        );
        assert_eq!(highlight.counts(), (2, 0));
    }

    // Four points of any other symbology are dots
    let highlight = Highlight::plan(&points, BarcodeFormat::QrCode, 1.0);
    assert_eq!(highlight.counts(), (0, 4));

    // A pair with a missing end is skipped
    let partial = [points[0], points[1], None, points[3]];
    let highlight = Highlight::plan(&partial, BarcodeFormat::UpcA, 1.0);
    assert_eq!(highlight.counts(), (1, 0));
}

#[test]
fn test_highlight_dots_skip_null_points() {
    let points = [
        Some(ResultPoint::new(1.0, 1.0)),
        None,
        Some(ResultPoint::new(5.0, 5.0)),
    ];
    let highlight = Highlight::plan(&points, BarcodeFormat::QrCode, 1.0);
    assert_eq!(highlight.counts(), (0, 2));

    let mut canvas = RecordingCanvas::new(10, 10);
    highlight.render(&mut canvas, Color::WHITE);
    assert_eq!(canvas.points().len(), 2);
    assert!(canvas.ops().iter().all(|op| matches!(
        op,
        DrawOp::Point {
            stroke_width,
            ..
        } if *stroke_width == 10.0
    )));

    assert_eq!(
        Highlight::plan(&[], BarcodeFormat::QrCode, 1.0),
        Highlight::None
    );
    assert_eq!(Highlight::plan(&[None], BarcodeFormat::QrCode, 1.0).counts(), (0, 0));
}

#[tokio::test(start_paused = true)]
async fn test_tokio_dispatcher_delivers_in_order() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = TokioDispatcher::new(tx);

    dispatcher.post_delayed(SessionMessage::RestartPreview, Duration::from_millis(500));
    dispatcher.post(SessionMessage::Redraw { dirty: None });

    let first = rx.recv().await.unwrap().into_live().unwrap();
    assert!(matches!(first, SessionMessage::Redraw { .. }));

    let second = rx.recv().await.unwrap().into_live().unwrap();
    assert!(matches!(second, SessionMessage::RestartPreview));
}

#[tokio::test(start_paused = true)]
async fn test_tokio_dispatcher_quit_drops_pending_messages() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = TokioDispatcher::new(tx);

    dispatcher.post(SessionMessage::Redraw { dirty: None });
    dispatcher.post_delayed(SessionMessage::RestartPreview, Duration::from_millis(500));
    assert_eq!(dispatcher.pending_delayed(), 1);

    dispatcher.quit_synchronously();
    assert_eq!(dispatcher.pending_delayed(), 0);

    // Already queued, but stale
    let queued = rx.recv().await.unwrap();
    assert!(queued.into_live().is_none());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(rx.try_recv().is_err());

    // Posting after quit is a no-op
    dispatcher.post(SessionMessage::RestartPreview);
    assert!(rx.try_recv().is_err());
}

struct RuntimeFixture {
    host: mpsc::UnboundedSender<HostEvent>,
    runtime: SessionRuntime<RecordingCanvas>,
    calls: Arc<CallLog>,
    event_bus: Arc<EventBus>,
}

fn create_runtime_fixture() -> RuntimeFixture {
    let (host, host_rx) = mpsc::unbounded_channel();
    RuntimeFixture {
        host,
        runtime: SessionRuntime::new(host_rx, RecordingCanvas::new(480, 800)),
        calls: Arc::new(CallLog::default()),
        event_bus: Arc::new(EventBus::new(256)),
    }
}

fn build_session(
    dispatch: TokioDispatchFactory,
    orientation: OrientationStrategy,
    decoder: Box<dyn DecodeWorker>,
    calls: &Arc<CallLog>,
    event_bus: &Arc<EventBus>,
) -> crate::error::Result<CaptureCoordinator> {
    let session = SessionConfig {
        orientation,
        ..SessionConfig::default()
    };
    Ok(CaptureCoordinator::new(
        session,
        ViewfinderRenderer::new(ViewfinderConfig::default())?,
        DisplayRotation::Rotation0,
        Collaborators {
            camera: Box::new(SimulatedCamera::new(DisplayConfig::default())),
            feedback: Box::new(FakeFeedback {
                calls: Arc::clone(calls),
                enabled: false,
            }),
            idle: Box::new(FakeIdle {
                calls: Arc::clone(calls),
            }),
            decoder,
            dispatch: Box::new(dispatch),
        },
        Arc::clone(event_bus),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_runtime_scans_after_failed_attempt() {
    use crate::simulation::{SimulatedDecodeWorker, SimulationConfig};

    let mut fixture = create_runtime_fixture();
    fixture.host.send(HostEvent::Foreground).unwrap();
    fixture
        .host
        .send(HostEvent::SurfaceReady(Some(SurfaceHandle(1))))
        .unwrap();

    let host = fixture.host.clone();
    let calls = Arc::clone(&fixture.calls);
    let event_bus = Arc::clone(&fixture.event_bus);
    let mut events = EventReceiver::new(
        event_bus.subscribe(),
        EventFilter::EventTypes(vec!["restart_scheduled", "feedback_played"]),
        "runtime-test".to_string(),
    );

    let outcome = fixture
        .runtime
        .launch(|dispatch| {
            let decoder = SimulatedDecodeWorker::new(
                SimulationConfig {
                    payload: "ABC123".to_string(),
                    fail_attempts: 1,
                    frame_size: (64, 48),
                    ..SimulationConfig::default()
                },
                host.clone(),
                Arc::new(crate::viewfinder::PossiblePointSet::new(5, 20)),
            );
            build_session(
                dispatch,
                OrientationStrategy::Locked,
                Box::new(decoder),
                &calls,
                &event_bus,
            )
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ScanOutcome::Success {
            text: "ABC123".to_string()
        }
    );
    assert_eq!(calls.count("play"), 2);
    assert_eq!(
        events.drain(),
        vec![
            ScanEvent::FeedbackPlayed,
            ScanEvent::RestartScheduled { delay_ms: 500 },
            ScanEvent::FeedbackPlayed,
        ]
    );

    // The overlay was animated while scanning
    let draws = fixture
        .runtime
        .canvas()
        .ops()
        .iter()
        .filter(|op| matches!(op, DrawOp::Clear { .. }))
        .count();
    assert!(draws > 1);
}

#[tokio::test(start_paused = true)]
async fn test_runtime_relaunches_after_rotation_flip() {
    let mut fixture = create_runtime_fixture();
    for event in [
        HostEvent::Foreground,
        HostEvent::SurfaceReady(Some(SurfaceHandle(7))),
        HostEvent::Orientation(90),
        HostEvent::Orientation(270),
        HostEvent::Key(SessionKey::Back),
    ] {
        fixture.host.send(event).unwrap();
    }

    let calls = Arc::clone(&fixture.calls);
    let event_bus = Arc::clone(&fixture.event_bus);
    let outcome = fixture
        .runtime
        .launch(|dispatch| {
            build_session(
                dispatch,
                OrientationStrategy::Sensor,
                Box::new(FakeDecoder {
                    calls: Arc::clone(&calls),
                }),
                &calls,
                &event_bus,
            )
        })
        .await
        .unwrap();

    assert_eq!(outcome, ScanOutcome::Cancelled);
    assert_eq!(fixture.runtime.launches(), 2);
    // Each launch opened the camera and asked for a decode
    assert_eq!(calls.count("request"), 2);
    // Both sessions released their idle timers
    assert_eq!(calls.count("shutdown"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_runtime_teardown_cancels() {
    let mut fixture = create_runtime_fixture();
    fixture.host.send(HostEvent::Foreground).unwrap();
    fixture.host.send(HostEvent::Teardown).unwrap();

    let calls = Arc::clone(&fixture.calls);
    let event_bus = Arc::clone(&fixture.event_bus);
    let outcome = fixture
        .runtime
        .launch(|dispatch| {
            build_session(
                dispatch,
                OrientationStrategy::Locked,
                Box::new(FakeDecoder {
                    calls: Arc::clone(&calls),
                }),
                &calls,
                &event_bus,
            )
        })
        .await
        .unwrap();

    assert_eq!(outcome, ScanOutcome::Cancelled);
    assert_eq!(calls.count("shutdown"), 1);
    assert_eq!(calls.count("request"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_runtime_fatal_camera_error_cancels_after_notice() {
    let mut fixture = create_runtime_fixture();
    fixture.host.send(HostEvent::Foreground).unwrap();
    fixture
        .host
        .send(HostEvent::SurfaceReady(Some(SurfaceHandle(1))))
        .unwrap();
    fixture.host.send(HostEvent::NoticeDismissed).unwrap();

    let calls = Arc::clone(&fixture.calls);
    let event_bus = Arc::clone(&fixture.event_bus);
    let outcome = fixture
        .runtime
        .launch(|dispatch| {
            let mut coordinator = build_session(
                dispatch,
                OrientationStrategy::Locked,
                Box::new(FakeDecoder {
                    calls: Arc::clone(&calls),
                }),
                &calls,
                &event_bus,
            )?;
            // Swap in a camera that refuses to open
            let camera = SimulatedCamera::new(DisplayConfig::default());
            camera.fail_next_open(CameraError::HardwareRuntime {
                details: "service unavailable".to_string(),
            });
            coordinator.camera = Box::new(camera);
            Ok(coordinator)
        })
        .await
        .unwrap();

    assert_eq!(outcome, ScanOutcome::Cancelled);
    assert_eq!(calls.count("request"), 0);
    assert_eq!(calls.count("shutdown"), 1);
}

use crate::canvas::RasterImage;
use crate::collaborators::DecodeWorker;
use crate::decode::{BarcodeFormat, DecodeOutcome};
use crate::error::Result;
use crate::geometry::ResultPoint;
use crate::session::HostEvent;
use crate::viewfinder::PossiblePointSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Candidate points reported per simulated decode attempt
const CANDIDATES_PER_ATTEMPT: u32 = 4;

/// What the simulated decode worker produces
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub payload: String,
    pub format: BarcodeFormat,
    /// Attempts that fail before the payload decodes
    pub fail_attempts: u32,
    /// Time one decode attempt takes
    pub decode_time: Duration,
    /// Size of the frames handed back with each outcome
    pub frame_size: (u32, u32),
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            payload: "SCANCAM-DEMO".to_string(),
            format: BarcodeFormat::Code128,
            fail_attempts: 1,
            decode_time: Duration::from_millis(600),
            frame_size: (320, 240),
        }
    }
}

/// Decode worker for hosts without a real decoder: reports candidate
/// points while "decoding", then a failure or the configured payload.
pub struct SimulatedDecodeWorker {
    config: SimulationConfig,
    host: mpsc::UnboundedSender<HostEvent>,
    points: Arc<PossiblePointSet>,
    attempts: u32,
    task: Option<JoinHandle<()>>,
}

impl SimulatedDecodeWorker {
    pub fn new(
        config: SimulationConfig,
        host: mpsc::UnboundedSender<HostEvent>,
        points: Arc<PossiblePointSet>,
    ) -> Self {
        Self {
            config,
            host,
            points,
            attempts: 0,
            task: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl DecodeWorker for SimulatedDecodeWorker {
    fn request_decode(&mut self) {
        self.abort_task();

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available, decode request dropped");
                return;
            }
        };

        self.attempts += 1;
        let attempt = self.attempts;
        let succeed = attempt > self.config.fail_attempts;
        let config = self.config.clone();
        let host = self.host.clone();
        let points = Arc::clone(&self.points);

        debug!("Simulated decode attempt {} started", attempt);
        self.task = Some(handle.spawn(async move {
            let (width, height) = config.frame_size;
            let step = config.decode_time / CANDIDATES_PER_ATTEMPT;

            for i in 0..CANDIDATES_PER_ATTEMPT {
                tokio::time::sleep(step).await;
                points.add(candidate_point(width, height, attempt, i));
            }

            let frame = match synthetic_frame(width, height) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Failed to build simulated frame: {}", e);
                    return;
                }
            };

            let outcome = if succeed {
                info!("Simulated decode attempt {} found '{}'", attempt, config.payload);
                let y = height as f32 / 2.0;
                DecodeOutcome::new(config.payload.clone(), config.format)
                    .with_points(vec![
                        Some(ResultPoint::new(width as f32 * 0.15, y)),
                        Some(ResultPoint::new(width as f32 * 0.85, y)),
                    ])
                    .with_raster(frame, 1.0)
            } else {
                debug!("Simulated decode attempt {} found nothing", attempt);
                DecodeOutcome::failed(frame)
            };

            if host.send(HostEvent::Decode(outcome)).is_err() {
                debug!("Session gone before simulated decode completed");
            }
        }));
    }

    fn cancel(&mut self) {
        if self.task.is_some() {
            debug!("Cancelling simulated decode");
        }
        self.abort_task();
    }
}

impl Drop for SimulatedDecodeWorker {
    fn drop(&mut self) {
        self.abort_task();
    }
}

/// Deterministic scatter of candidates across the middle band of the frame
fn candidate_point(width: u32, height: u32, attempt: u32, index: u32) -> ResultPoint {
    let spread = (attempt * 7 + index * 13) % 10;
    ResultPoint::new(
        width as f32 * (0.2 + 0.06 * spread as f32),
        height as f32 * (0.4 + 0.05 * (index % 4) as f32),
    )
}

/// Greyscale frame with vertical bars, roughly what a 1-D symbol looks like
fn synthetic_frame(width: u32, height: u32) -> Result<RasterImage> {
    let luma: Vec<u8> = (0..height)
        .flat_map(|_| (0..width).map(|x| if (x / 4) % 3 == 0 { 20 } else { 230 }))
        .collect();
    RasterImage::from_luma(width, height, &luma)
}

use crate::config::{LaserStyle, ViewfinderConfig};
use crate::error::{RenderError, Result};
use crate::geometry::{Color, Rect};
use image::{Rgba, RgbaImage};
use tracing::{debug, info};

/// Opacity levels the bar-style scan line cycles through
pub const SCANNER_ALPHA: [u8; 8] = [0, 64, 128, 192, 255, 192, 128, 64];

/// Height of the bitmap-style scan line in pixels
pub const BITMAP_LASER_HEIGHT: i32 = 18;

/// Vertical position and pulse phase of the sweeping scan line
#[derive(Debug, Clone, Default)]
pub struct ScanLine {
    position: Option<i32>,
    alpha_index: usize,
}

impl ScanLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position, `None` before the first draw
    pub fn position(&self) -> Option<i32> {
        self.position
    }

    /// Move the line down by `step`, wrapping to the top once it reaches
    /// the bottom edge. The first call starts from the top edge.
    pub fn advance(&mut self, frame: &Rect, step: i32) -> i32 {
        let mut position = self.position.unwrap_or(frame.top) + step;
        if position >= frame.bottom {
            position = frame.top;
        }
        self.position = Some(position);
        position
    }

    /// Opacity for this draw; advances the pulse one step
    pub fn next_alpha(&mut self) -> u8 {
        let alpha = SCANNER_ALPHA[self.alpha_index];
        self.alpha_index = (self.alpha_index + 1) % SCANNER_ALPHA.len();
        alpha
    }
}

/// Load the bitmap used by the bitmap scan-line style. Without a configured
/// asset a gradient strip in the laser colour is generated.
pub fn load_laser_bitmap(config: &ViewfinderConfig) -> Result<Option<RgbaImage>> {
    if config.laser_style != LaserStyle::Bitmap {
        return Ok(None);
    }

    match &config.laser_bitmap_path {
        Some(path) => {
            let bitmap = image::open(path)
                .map_err(|e| RenderError::AssetLoad {
                    path: path.clone(),
                    details: e.to_string(),
                })?
                .to_rgba8();
            info!(
                "Loaded laser bitmap {} ({}x{})",
                path,
                bitmap.width(),
                bitmap.height()
            );
            Ok(Some(bitmap))
        }
        None => {
            debug!("No laser bitmap configured, generating gradient strip");
            Ok(Some(gradient_strip(config.laser_color)))
        }
    }
}

/// A strip that is opaque along its centre row and fades towards the edges
fn gradient_strip(color: Color) -> RgbaImage {
    let height = BITMAP_LASER_HEIGHT as u32;
    let center = (height - 1) as f32 / 2.0;
    RgbaImage::from_fn(64, height, |_, y| {
        let distance = (y as f32 - center).abs() / center;
        let alpha = (color.alpha() as f32 * (1.0 - distance)).round() as u8;
        Rgba([color.red(), color.green(), color.blue(), alpha])
    })
}

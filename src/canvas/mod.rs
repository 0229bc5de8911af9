mod raster;
mod recording;

pub use raster::{load_font, RasterImage};
pub use recording::{DrawOp, RecordingCanvas};

use crate::geometry::{Color, Rect};
use image::RgbaImage;

/// Colour and stroke settings for a single draw call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub stroke_width: f32,
}

impl Paint {
    pub fn fill(color: Color) -> Self {
        Self {
            color,
            stroke_width: 0.0,
        }
    }

    pub fn stroke(color: Color, stroke_width: f32) -> Self {
        Self {
            color,
            stroke_width,
        }
    }

    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.color = self.color.with_alpha(alpha);
        self
    }
}

/// Drawing surface used by the viewfinder and by result highlighting.
///
/// Rectangles follow half-open semantics: `fill_rect` covers
/// `[left, right) x [top, bottom)`. Text origins are baselines.
pub trait Canvas {
    fn size(&self) -> (u32, u32);

    /// Restrict every following call to `region`; `None` lifts the clip
    fn set_clip(&mut self, region: Option<Rect>);

    /// Reset `region` (or the whole surface) to transparent
    fn clear(&mut self, region: Option<Rect>);

    fn fill_rect(&mut self, rect: Rect, paint: &Paint);

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), paint: &Paint);

    /// A square-ish dot whose diameter is the paint's stroke width
    fn draw_point(&mut self, at: (f32, f32), paint: &Paint);

    fn draw_circle(&mut self, center: (f32, f32), radius: f32, paint: &Paint);

    /// Stretch `bitmap` to fill `dst`
    fn draw_bitmap(&mut self, bitmap: &RgbaImage, dst: Rect, paint: &Paint);

    fn draw_text(&mut self, text: &str, origin: (f32, f32), size: f32, paint: &Paint);

    fn measure_text(&self, text: &str, size: f32) -> f32;
}

/// Width estimate used when no font metrics are available
pub(crate) fn approximate_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5
}

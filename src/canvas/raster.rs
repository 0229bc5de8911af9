use super::{approximate_text_width, Canvas, Paint};
use crate::error::{RenderError, Result};
use crate::geometry::{Color, Rect};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut,
    draw_text_mut, text_size, Blend,
};
use imageproc::point::Point;
use imageproc::rect::Rect as PixelRect;
use rusttype::{Font, Scale};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// RGBA raster that can be drawn on with alpha blending.
///
/// Serves both as the camera frame carried by a live-scan decode outcome and
/// as the display surface the viewfinder renders into.
pub struct RasterImage {
    image: Blend<RgbaImage>,
    font: Option<Arc<Font<'static>>>,
    clip: Option<Rect>,
}

impl RasterImage {
    /// Create a fully transparent raster
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(RgbaImage::new(width, height))
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image: Blend(image),
            font: None,
            clip: None,
        }
    }

    /// Opaque greyscale frame, the shape a decode worker hands back
    pub fn from_luma(width: u32, height: u32, luma: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if luma.len() != expected {
            return Err(crate::error::ScancamError::component(
                "raster".to_string(),
                format!(
                    "Expected {} luminance bytes for {}x{}, got {}",
                    expected,
                    width,
                    height,
                    luma.len()
                ),
            ));
        }

        let image = RgbaImage::from_fn(width, height, |x, y| {
            let v = luma[(y * width + x) as usize];
            Rgba([v, v, v, 255])
        });
        Ok(Self::from_image(image))
    }

    /// Attach a TrueType font for text rendering
    pub fn with_font(mut self, font: Arc<Font<'static>>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image.0
    }

    pub fn into_image(self) -> RgbaImage {
        self.image.0
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let [r, g, b, a] = self.image.0.get_pixel(x, y).0;
        Color::argb(a, r, g, b)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.0.save(path.as_ref())?;
        debug!("Saved raster to {}", path.as_ref().display());
        Ok(())
    }

    fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.image.0.width() as i32, self.image.0.height() as i32)
    }

    /// Part of `rect` that lies on the surface and inside the clip
    fn visible(&self, rect: Rect) -> Option<Rect> {
        let bounds = self.clip.map_or(Some(self.bounds()), |clip| {
            intersect(clip, self.bounds())
        })?;
        intersect(rect, bounds)
    }

    /// Run `draw` against the clipped part of the surface only. `draw`
    /// receives the target buffer and the origin to subtract from surface
    /// coordinates.
    fn draw_clipped<F>(&mut self, draw: F)
    where
        F: FnOnce(&mut Blend<RgbaImage>, (f32, f32)),
    {
        let Some(clip) = self.clip else {
            draw(&mut self.image, (0.0, 0.0));
            return;
        };
        let Some(clip) = self.visible(clip) else {
            return;
        };

        let region = imageops::crop_imm(
            &self.image.0,
            clip.left as u32,
            clip.top as u32,
            clip.width() as u32,
            clip.height() as u32,
        )
        .to_image();
        let mut scratch = Blend(region);
        draw(&mut scratch, (clip.left as f32, clip.top as f32));
        imageops::replace(&mut self.image.0, &scratch.0, clip.left as i64, clip.top as i64);
    }
}

fn intersect(a: Rect, b: Rect) -> Option<Rect> {
    let clipped = Rect::new(
        a.left.max(b.left),
        a.top.max(b.top),
        a.right.min(b.right),
        a.bottom.min(b.bottom),
    );
    (!clipped.is_empty()).then_some(clipped)
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.image.0.width())
            .field("height", &self.image.0.height())
            .field("font", &self.font.is_some())
            .field("clip", &self.clip)
            .finish()
    }
}

/// Load a TrueType font from disk
pub fn load_font<P: AsRef<Path>>(path: P) -> Result<Arc<Font<'static>>> {
    let path_str = path.as_ref().to_string_lossy().to_string();
    let data = std::fs::read(path.as_ref()).map_err(|e| RenderError::FontLoad {
        path: path_str.clone(),
        details: e.to_string(),
    })?;

    let font = Font::try_from_vec(data).ok_or_else(|| RenderError::FontLoad {
        path: path_str,
        details: "not a valid TrueType font".to_string(),
    })?;

    Ok(Arc::new(font))
}

fn pixel(color: Color) -> Rgba<u8> {
    Rgba(color.to_rgba())
}

impl Canvas for RasterImage {
    fn size(&self) -> (u32, u32) {
        self.image.0.dimensions()
    }

    fn set_clip(&mut self, region: Option<Rect>) {
        self.clip = region;
    }

    fn clear(&mut self, region: Option<Rect>) {
        let Some(region) = self.visible(region.unwrap_or_else(|| self.bounds())) else {
            return;
        };

        let transparent = pixel(Color::TRANSPARENT);
        for y in region.top..region.bottom {
            for x in region.left..region.right {
                self.image.0.put_pixel(x as u32, y as u32, transparent);
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        let Some(rect) = self.visible(rect) else {
            return;
        };

        draw_filled_rect_mut(
            &mut self.image,
            PixelRect::at(rect.left, rect.top).of_size(rect.width() as u32, rect.height() as u32),
            pixel(paint.color),
        );
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), paint: &Paint) {
        let color = pixel(paint.color);
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = (dx * dx + dy * dy).sqrt();

        if paint.stroke_width <= 1.0 {
            self.draw_clipped(|target, (ox, oy)| {
                draw_line_segment_mut(
                    target,
                    (from.0 - ox, from.1 - oy),
                    (to.0 - ox, to.1 - oy),
                    color,
                );
            });
            return;
        }
        if length < 0.5 {
            self.draw_point(from, paint);
            return;
        }

        // Thick lines are a filled quad around the segment
        let half = paint.stroke_width / 2.0;
        let (nx, ny) = (-dy / length * half, dx / length * half);
        let corners = [
            (from.0 + nx, from.1 + ny),
            (to.0 + nx, to.1 + ny),
            (to.0 - nx, to.1 - ny),
            (from.0 - nx, from.1 - ny),
        ];

        self.draw_clipped(|target, (ox, oy)| {
            let corners = corners
                .map(|(x, y)| Point::new((x - ox).round() as i32, (y - oy).round() as i32));
            if corners[0] == corners[3] {
                draw_line_segment_mut(
                    target,
                    (from.0 - ox, from.1 - oy),
                    (to.0 - ox, to.1 - oy),
                    color,
                );
            } else {
                draw_polygon_mut(target, &corners, color);
            }
        });
    }

    fn draw_point(&mut self, at: (f32, f32), paint: &Paint) {
        let radius = (paint.stroke_width / 2.0).max(0.5);
        self.draw_circle(at, radius, paint);
    }

    fn draw_circle(&mut self, center: (f32, f32), radius: f32, paint: &Paint) {
        let color = pixel(paint.color);
        let radius = radius.round().max(0.0) as i32;
        self.draw_clipped(|target, (ox, oy)| {
            draw_filled_circle_mut(
                target,
                ((center.0 - ox).round() as i32, (center.1 - oy).round() as i32),
                radius,
                color,
            );
        });
    }

    fn draw_bitmap(&mut self, bitmap: &RgbaImage, dst: Rect, _paint: &Paint) {
        if dst.is_empty() || bitmap.width() == 0 || bitmap.height() == 0 {
            return;
        }

        let scaled = imageops::resize(
            bitmap,
            dst.width() as u32,
            dst.height() as u32,
            FilterType::Nearest,
        );
        self.draw_clipped(|target, (ox, oy)| {
            imageops::overlay(
                &mut target.0,
                &scaled,
                (dst.left as f32 - ox) as i64,
                (dst.top as f32 - oy) as i64,
            );
        });
    }

    fn draw_text(&mut self, text: &str, origin: (f32, f32), size: f32, paint: &Paint) {
        let Some(font) = self.font.clone() else {
            trace!("No font attached, skipping text '{}'", text);
            return;
        };

        let scale = Scale::uniform(size);
        let color = pixel(paint.color);
        // imageproc positions text by its top edge; the origin is a baseline
        let top = origin.1 - size;
        self.draw_clipped(|target, (ox, oy)| {
            draw_text_mut(
                target,
                color,
                (origin.0 - ox).round() as i32,
                (top - oy).round() as i32,
                scale,
                &font,
                text,
            );
        });
    }

    fn measure_text(&self, text: &str, size: f32) -> f32 {
        match &self.font {
            Some(font) => text_size(Scale::uniform(size), font, text).0 as f32,
            None => approximate_text_width(text, size),
        }
    }
}

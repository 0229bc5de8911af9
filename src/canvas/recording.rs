use super::{approximate_text_width, Canvas, Paint};
use crate::geometry::{Color, Rect};
use image::RgbaImage;

/// A single recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clip {
        region: Option<Rect>,
    },
    Clear {
        region: Option<Rect>,
    },
    FillRect {
        rect: Rect,
        color: Color,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Color,
        stroke_width: f32,
    },
    Point {
        at: (f32, f32),
        color: Color,
        stroke_width: f32,
    },
    Circle {
        center: (f32, f32),
        radius: f32,
        color: Color,
    },
    Bitmap {
        width: u32,
        height: u32,
        dst: Rect,
    },
    Text {
        text: String,
        origin: (f32, f32),
        size: f32,
        color: Color,
    },
}

/// Canvas that records every call instead of rasterising
#[derive(Debug, Clone)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drain the recorded operations
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn lines(&self) -> Vec<&DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .collect()
    }

    pub fn points(&self) -> Vec<&DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Point { .. }))
            .collect()
    }

    pub fn circles(&self) -> Vec<&DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Circle { .. }))
            .collect()
    }

    pub fn fill_rects(&self) -> Vec<(Rect, Color)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { rect, color } => Some((*rect, *color)),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_clip(&mut self, region: Option<Rect>) {
        self.ops.push(DrawOp::Clip { region });
    }

    fn clear(&mut self, region: Option<Rect>) {
        self.ops.push(DrawOp::Clear { region });
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        self.ops.push(DrawOp::FillRect {
            rect,
            color: paint.color,
        });
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), paint: &Paint) {
        self.ops.push(DrawOp::Line {
            from,
            to,
            color: paint.color,
            stroke_width: paint.stroke_width,
        });
    }

    fn draw_point(&mut self, at: (f32, f32), paint: &Paint) {
        self.ops.push(DrawOp::Point {
            at,
            color: paint.color,
            stroke_width: paint.stroke_width,
        });
    }

    fn draw_circle(&mut self, center: (f32, f32), radius: f32, paint: &Paint) {
        self.ops.push(DrawOp::Circle {
            center,
            radius,
            color: paint.color,
        });
    }

    fn draw_bitmap(&mut self, bitmap: &RgbaImage, dst: Rect, _paint: &Paint) {
        self.ops.push(DrawOp::Bitmap {
            width: bitmap.width(),
            height: bitmap.height(),
            dst,
        });
    }

    fn draw_text(&mut self, text: &str, origin: (f32, f32), size: f32, paint: &Paint) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            origin,
            size,
            color: paint.color,
        });
    }

    fn measure_text(&self, text: &str, size: f32) -> f32 {
        approximate_text_width(text, size)
    }
}

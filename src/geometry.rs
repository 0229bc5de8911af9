use serde::{Deserialize, Serialize};

/// Integer rectangle in display or preview coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Grow the rectangle by `amount` on all four sides
    pub fn expanded(&self, amount: i32) -> Self {
        Self {
            left: self.left - amount,
            top: self.top - amount,
            right: self.right + amount,
            bottom: self.bottom + amount,
        }
    }
}

/// Point reported by the decode worker, in preview coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultPoint {
    pub x: f32,
    pub y: f32,
}

impl ResultPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The framing rectangle in display space paired with the same region in
/// preview space. Only constructible when both are known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub frame: Rect,
    pub preview: Rect,
}

impl FrameGeometry {
    pub fn from_parts(frame: Option<Rect>, preview: Option<Rect>) -> Option<Self> {
        match (frame, preview) {
            (Some(frame), Some(preview)) => Some(Self { frame, preview }),
            _ => None,
        }
    }

    /// Independent X/Y scale factors from preview space to display space
    pub fn scale(&self) -> (f32, f32) {
        let scale_x = self.frame.width() as f32 / self.preview.width() as f32;
        let scale_y = self.frame.height() as f32 / self.preview.height() as f32;
        (scale_x, scale_y)
    }

    /// Map a preview-space point into display space
    pub fn to_display(&self, point: ResultPoint) -> (f32, f32) {
        let (scale_x, scale_y) = self.scale();
        (
            self.frame.left as f32 + point.x * scale_x,
            self.frame.top as f32 + point.y * scale_y,
        )
    }
}

/// 32-bit ARGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const GREEN: Color = Color(0xFF00_FF00);
    pub const TRANSPARENT: Color = Color(0x0000_0000);

    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn alpha(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(&self) -> u8 {
        self.0 as u8
    }

    /// Same colour with the alpha channel replaced
    pub fn with_alpha(&self, alpha: u8) -> Self {
        Color((self.0 & 0x00FF_FFFF) | ((alpha as u32) << 24))
    }

    pub fn to_rgba(&self) -> [u8; 4] {
        [self.red(), self.green(), self.blue(), self.alpha()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_dimensions() {
        let rect = Rect::new(10, 20, 110, 70);
        assert_eq!(rect.width(), 100);
        assert_eq!(rect.height(), 50);
        assert!(!rect.is_empty());
        assert_eq!(rect.expanded(6), Rect::new(4, 14, 116, 76));
    }

    #[test]
    fn test_geometry_requires_both_rects() {
        let frame = Rect::new(0, 0, 100, 100);
        assert!(FrameGeometry::from_parts(Some(frame), None).is_none());
        assert!(FrameGeometry::from_parts(None, Some(frame)).is_none());
        assert!(FrameGeometry::from_parts(Some(frame), Some(frame)).is_some());
    }

    #[test]
    fn test_preview_to_display_mapping() {
        let geometry = FrameGeometry {
            frame: Rect::new(100, 200, 400, 500),
            preview: Rect::new(0, 0, 200, 150),
        };

        let (x, y) = geometry.to_display(ResultPoint::new(10.0, 30.0));
        assert_eq!(x, 100.0 + 10.0 * 300.0 / 200.0);
        assert_eq!(y, 200.0 + 30.0 * 300.0 / 150.0);
    }

    #[test]
    fn test_color_alpha_replacement() {
        let color = Color(0x60_11_22_33);
        assert_eq!(color.alpha(), 0x60);
        assert_eq!(color.with_alpha(0xFF), Color(0xFF11_2233));
        assert_eq!(color.to_rgba(), [0x11, 0x22, 0x33, 0x60]);
        assert_eq!(Color::argb(0x80, 1, 2, 3), Color(0x8001_0203));
    }
}

use super::laser::{load_laser_bitmap, ScanLine, BITMAP_LASER_HEIGHT};
use super::points::PossiblePointSet;
use crate::canvas::{Canvas, Paint};
use crate::config::{LaserStyle, ViewfinderConfig};
use crate::error::Result;
use crate::geometry::{FrameGeometry, Rect, ResultPoint};
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Follow-up draw the renderer asks its host for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedrawRequest {
    pub delay: Duration,
    /// Region to invalidate; the frame grown by the point radius
    pub dirty: Rect,
}

/// Animated overlay drawn over the camera preview.
///
/// Each call to [`ViewfinderRenderer::draw`] renders one frame of the
/// animation and returns the next redraw it needs. The renderer owns no
/// timer; the hosting session decides whether to honour the request.
pub struct ViewfinderRenderer {
    config: ViewfinderConfig,
    scan_line: ScanLine,
    laser_bitmap: Option<RgbaImage>,
    points: Arc<PossiblePointSet>,
    prompt: String,
    prompt_visible: bool,
}

impl ViewfinderRenderer {
    pub fn new(config: ViewfinderConfig) -> Result<Self> {
        let laser_bitmap = load_laser_bitmap(&config)?;
        let points = Arc::new(PossiblePointSet::new(
            config.possible_point_num,
            config.max_result_points,
        ));

        debug!(
            "Viewfinder renderer created (laser: {:?}, max points: {})",
            config.laser_style, config.max_result_points
        );

        Ok(Self {
            prompt: config.tip_text.clone(),
            prompt_visible: true,
            config,
            scan_line: ScanLine::new(),
            laser_bitmap,
            points,
        })
    }

    pub fn config(&self) -> &ViewfinderConfig {
        &self.config
    }

    /// Shared handle for producers of candidate points
    pub fn points_handle(&self) -> Arc<PossiblePointSet> {
        Arc::clone(&self.points)
    }

    pub fn add_possible_result_point(&self, point: ResultPoint) {
        self.points.add(point);
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt_visible.then_some(self.prompt.as_str())
    }

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
        self.prompt_visible = true;
    }

    pub fn hide_prompt(&mut self) {
        self.prompt_visible = false;
    }

    /// Restore the configured prompt and make it visible
    pub fn reset_prompt(&mut self) {
        self.prompt = self.config.tip_text.clone();
        self.prompt_visible = true;
    }

    pub fn scan_line_position(&self) -> Option<i32> {
        self.scan_line.position()
    }

    /// Render one animation frame. Nothing is drawn and no redraw is
    /// requested until the framing geometry is known.
    pub fn draw(
        &mut self,
        canvas: &mut dyn Canvas,
        geometry: Option<FrameGeometry>,
    ) -> Option<RedrawRequest> {
        let geometry = match geometry {
            Some(geometry) => geometry,
            None => {
                trace!("Framing geometry not configured, skipping draw");
                return None;
            }
        };
        let frame = geometry.frame;

        self.draw_mask(canvas, &frame);
        self.draw_corners(canvas, &frame);
        self.draw_scan_line(canvas, &frame);
        self.draw_prompt(canvas, &frame);
        self.draw_possible_points(canvas, &geometry);

        Some(RedrawRequest {
            delay: self.config.animation_delay(),
            dirty: frame.expanded(self.config.possible_point_size),
        })
    }

    fn draw_mask(&self, canvas: &mut dyn Canvas, frame: &Rect) {
        let (width, height) = canvas.size();
        let (width, height) = (width as i32, height as i32);
        let paint = Paint::fill(self.config.mask_color);

        canvas.fill_rect(Rect::new(0, 0, width, frame.top), &paint);
        canvas.fill_rect(
            Rect::new(0, frame.top, frame.left, frame.bottom + 1),
            &paint,
        );
        canvas.fill_rect(
            Rect::new(frame.right + 1, frame.top, width, frame.bottom + 1),
            &paint,
        );
        canvas.fill_rect(Rect::new(0, frame.bottom + 1, width, height), &paint);
    }

    fn draw_corners(&self, canvas: &mut dyn Canvas, frame: &Rect) {
        let length = self.config.corner_length;
        let thickness = self.config.corner_thickness;
        let paint = Paint::fill(self.config.corner_color);

        let corners = [
            // top left
            Rect::new(frame.left, frame.top, frame.left + length, frame.top + thickness),
            Rect::new(frame.left, frame.top, frame.left + thickness, frame.top + length),
            // top right
            Rect::new(frame.right - length, frame.top, frame.right, frame.top + thickness),
            Rect::new(frame.right - thickness, frame.top, frame.right, frame.top + length),
            // bottom left
            Rect::new(frame.left, frame.bottom - thickness, frame.left + length, frame.bottom),
            Rect::new(frame.left, frame.bottom - length, frame.left + thickness, frame.bottom),
            // bottom right
            Rect::new(frame.right - length, frame.bottom - thickness, frame.right, frame.bottom),
            Rect::new(frame.right - thickness, frame.bottom - length, frame.right, frame.bottom),
        ];

        for corner in corners {
            canvas.fill_rect(corner, &paint);
        }
    }

    fn draw_scan_line(&mut self, canvas: &mut dyn Canvas, frame: &Rect) {
        let position = self.scan_line.advance(frame, self.config.scanning_distance);

        match self.config.laser_style {
            LaserStyle::Bar => {
                let alpha = self.scan_line.next_alpha();
                let paint = Paint::fill(self.config.laser_color).with_alpha(alpha);
                canvas.fill_rect(
                    Rect::new(
                        frame.left,
                        position,
                        frame.right,
                        position + self.config.laser_height,
                    ),
                    &paint,
                );
            }
            LaserStyle::Bitmap => {
                if let Some(bitmap) = &self.laser_bitmap {
                    canvas.draw_bitmap(
                        bitmap,
                        Rect::new(
                            frame.left,
                            position,
                            frame.right,
                            position + BITMAP_LASER_HEIGHT,
                        ),
                        &Paint::fill(self.config.laser_color),
                    );
                }
            }
        }
    }

    fn draw_prompt(&self, canvas: &mut dyn Canvas, frame: &Rect) {
        if !self.prompt_visible || self.prompt.is_empty() {
            return;
        }

        let size = self.config.tip_text_size;
        let width = canvas.measure_text(&self.prompt, size);
        let x = frame.left as f32 + (frame.width() as f32 - width) / 2.0;
        let y = (frame.bottom + self.config.tip_text_margin_px()) as f32;
        let paint =
            Paint::fill(self.config.tip_text_color).with_alpha(self.config.tip_text_alpha);

        canvas.draw_text(&self.prompt, (x, y), size, &paint);
    }

    fn draw_possible_points(&self, canvas: &mut dyn Canvas, geometry: &FrameGeometry) {
        // Lock is released before any drawing happens
        let snapshot = self.points.rotate();

        let opacity = self.config.current_point_opacity;
        let radius = self.config.possible_point_size as f32;

        let current = Paint::fill(self.config.result_point_color).with_alpha(opacity);
        for point in &snapshot.current {
            canvas.draw_circle(geometry.to_display(*point), radius, &current);
        }

        let previous = Paint::fill(self.config.result_point_color).with_alpha(opacity / 2);
        for point in &snapshot.previous {
            canvas.draw_circle(geometry.to_display(*point), radius / 2.0, &previous);
        }
    }
}

impl std::fmt::Debug for ViewfinderRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewfinderRenderer")
            .field("laser_style", &self.config.laser_style)
            .field("scan_line", &self.scan_line)
            .field("prompt", &self.prompt())
            .finish()
    }
}

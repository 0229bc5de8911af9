use crate::canvas::{Canvas, Paint};
use crate::decode::BarcodeFormat;
use crate::geometry::{Color, ResultPoint};

const LINE_STROKE_WIDTH: f32 = 4.0;
const DOT_STROKE_WIDTH: f32 = 10.0;

type Segment = ((f32, f32), (f32, f32));

/// How the points of a decoded symbol are marked on the captured frame
#[derive(Debug, Clone, PartialEq)]
pub enum Highlight {
    None,
    /// The axis of a one-dimensional symbol
    Line(Segment),
    /// A retail symbol and its supplemental code
    Lines(Vec<Segment>),
    Dots(Vec<(f32, f32)>),
}

impl Highlight {
    /// Decide what to draw for `points`, scaled into raster space by
    /// `scale_factor`. Null points are skipped, never drawn.
    pub fn plan(
        points: &[Option<ResultPoint>],
        format: BarcodeFormat,
        scale_factor: f32,
    ) -> Self {
        let scaled: Vec<Option<(f32, f32)>> = points
            .iter()
            .map(|point| point.map(|p| (p.x * scale_factor, p.y * scale_factor)))
            .collect();

        match scaled.as_slice() {
            [] => Highlight::None,
            // A pair with a missing end draws nothing
            [a, b] => match (a, b) {
                (Some(a), Some(b)) => Highlight::Line((*a, *b)),
                _ => Highlight::None,
            },
            [first, second, third, fourth] if format.is_retail_pair() => {
                let segments = [(first, second), (third, fourth)]
                    .into_iter()
                    .filter_map(|pair| match pair {
                        (Some(a), Some(b)) => Some((*a, *b)),
                        _ => None,
                    })
                    .collect();
                Highlight::Lines(segments)
            }
            others => Highlight::Dots(others.iter().flatten().copied().collect()),
        }
    }

    /// Number of (lines, dots) this highlight draws
    pub fn counts(&self) -> (usize, usize) {
        match self {
            Highlight::None => (0, 0),
            Highlight::Line(_) => (1, 0),
            Highlight::Lines(segments) => (segments.len(), 0),
            Highlight::Dots(dots) => (0, dots.len()),
        }
    }

    pub fn render(&self, canvas: &mut dyn Canvas, color: Color) {
        match self {
            Highlight::None => {}
            Highlight::Line((from, to)) => {
                canvas.draw_line(*from, *to, &Paint::stroke(color, LINE_STROKE_WIDTH));
            }
            Highlight::Lines(segments) => {
                let paint = Paint::stroke(color, LINE_STROKE_WIDTH);
                for (from, to) in segments {
                    canvas.draw_line(*from, *to, &paint);
                }
            }
            Highlight::Dots(dots) => {
                let paint = Paint::stroke(color, DOT_STROKE_WIDTH);
                for dot in dots {
                    canvas.draw_point(*dot, &paint);
                }
            }
        }
    }
}

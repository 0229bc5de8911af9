//! Live viewfinder overlay: darkened mask, corner brackets, sweeping scan
//! line, prompt text and decaying candidate points.

mod laser;
mod points;
mod renderer;

pub use crate::config::LaserStyle;
pub use laser::{ScanLine, BITMAP_LASER_HEIGHT, SCANNER_ALPHA};
pub use points::{PointSnapshot, PossiblePointSet};
pub use renderer::{RedrawRequest, ViewfinderRenderer};

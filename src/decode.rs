use crate::canvas::RasterImage;
use crate::geometry::ResultPoint;
use serde::{Deserialize, Serialize};

/// Symbologies the decode worker can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeFormat {
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    DataMatrix,
    Ean8,
    Ean13,
    Itf,
    MaxiCode,
    Pdf417,
    QrCode,
    Rss14,
    RssExpanded,
    UpcA,
    UpcE,
    UpcEanExtension,
}

impl BarcodeFormat {
    /// Retail symbologies whose 4-point results are a primary symbol plus a
    /// supplemental code
    pub fn is_retail_pair(&self) -> bool {
        matches!(self, BarcodeFormat::UpcA | BarcodeFormat::Ean13)
    }
}

/// A completed decode attempt as reported by the decode worker.
///
/// An empty `text` means the attempt failed. `raster` is present only for a
/// live in-progress scan; replays of historical results carry none.
#[derive(Debug)]
pub struct DecodeOutcome {
    pub text: String,
    pub points: Vec<Option<ResultPoint>>,
    pub format: BarcodeFormat,
    pub raster: Option<RasterImage>,
    pub scale_factor: f32,
}

impl DecodeOutcome {
    pub fn new<S: Into<String>>(text: S, format: BarcodeFormat) -> Self {
        Self {
            text: text.into(),
            points: Vec::new(),
            format,
            raster: None,
            scale_factor: 1.0,
        }
    }

    /// A failed live-scan attempt over the given frame
    pub fn failed(raster: RasterImage) -> Self {
        Self {
            text: String::new(),
            points: Vec::new(),
            format: BarcodeFormat::QrCode,
            raster: Some(raster),
            scale_factor: 1.0,
        }
    }

    pub fn with_points(mut self, points: Vec<Option<ResultPoint>>) -> Self {
        self.points = points;
        self
    }

    pub fn with_raster(mut self, raster: RasterImage, scale_factor: f32) -> Self {
        self.raster = Some(raster);
        self.scale_factor = scale_factor;
        self
    }

    pub fn is_success(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn is_live_scan(&self) -> bool {
        self.raster.is_some()
    }
}

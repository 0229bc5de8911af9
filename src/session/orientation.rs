use super::DisplayRotation;
use tracing::{debug, info, trace};

/// Coarse device rotation derived from raw sensor degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationBucket {
    None,
    Ninety,
    TwoSeventy,
}

impl RotationBucket {
    /// Negative degrees mean the sensor could not tell (device lying flat)
    pub fn classify(degrees: i32) -> Self {
        if degrees > 45 && degrees < 135 {
            RotationBucket::Ninety
        } else if degrees > 225 && degrees < 315 {
            RotationBucket::TwoSeventy
        } else {
            RotationBucket::None
        }
    }

    fn opposite(&self) -> Option<Self> {
        match self {
            RotationBucket::Ninety => Some(RotationBucket::TwoSeventy),
            RotationBucket::TwoSeventy => Some(RotationBucket::Ninety),
            RotationBucket::None => None,
        }
    }
}

/// Detects the 90/270 half-turn the host rotation handling cannot recover
/// from, so the session can be relaunched.
#[derive(Debug)]
pub struct OrientationMonitor {
    last: RotationBucket,
    enabled: bool,
}

impl OrientationMonitor {
    /// Seed from the current display rotation. The sensor reports the
    /// opposite direction to the display rotation.
    pub fn new(rotation: DisplayRotation) -> Self {
        let last = match rotation {
            DisplayRotation::Rotation90 => RotationBucket::TwoSeventy,
            DisplayRotation::Rotation270 => RotationBucket::Ninety,
            _ => RotationBucket::None,
        };
        debug!("Orientation monitor seeded with {:?}", last);
        Self {
            last,
            enabled: false,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn last(&self) -> RotationBucket {
        self.last
    }

    /// Feed a raw sensor reading. Returns true when the session must be
    /// relaunched.
    pub fn on_orientation(&mut self, degrees: i32) -> bool {
        if !self.enabled {
            return false;
        }

        let bucket = RotationBucket::classify(degrees);
        trace!("Orientation {} classified as {:?}", degrees, bucket);

        let Some(opposite) = bucket.opposite() else {
            return false;
        };

        let flipped = self.last == opposite;
        if flipped {
            info!("Rotation flipped from {:?} to {:?}", self.last, bucket);
        }
        self.last = bucket;
        flipped
    }
}

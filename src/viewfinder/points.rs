use crate::geometry::ResultPoint;
use parking_lot::Mutex;
use tracing::trace;

#[derive(Debug, Default)]
struct Generations {
    current: Vec<ResultPoint>,
    previous: Vec<ResultPoint>,
}

/// Points to draw for one render pass, copied out of the shared set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSnapshot {
    /// Live candidates; drawn at full size
    pub current: Vec<ResultPoint>,
    /// What the previous slot held after this pass; drawn faded
    pub previous: Vec<ResultPoint>,
}

/// Candidate detection points shared between the decode worker and the
/// render pass.
///
/// The lock is only held while a collection is touched, never while drawing.
#[derive(Debug)]
pub struct PossiblePointSet {
    generations: Mutex<Generations>,
    max_points: usize,
}

impl PossiblePointSet {
    pub fn new(capacity: usize, max_points: usize) -> Self {
        Self {
            generations: Mutex::new(Generations {
                current: Vec::with_capacity(capacity),
                previous: Vec::with_capacity(capacity),
            }),
            max_points,
        }
    }

    /// Append a point to the current generation, trimming the oldest
    /// entries down to half the maximum once it is exceeded
    pub fn add(&self, point: ResultPoint) {
        let mut generations = self.generations.lock();
        generations.current.push(point);

        let size = generations.current.len();
        if size > self.max_points {
            let keep = self.max_points / 2;
            generations.current.drain(..size - keep);
            trace!("Trimmed possible points from {} to {}", size, keep);
        }
    }

    /// Overwrite the previous generation with a copy of the current one and
    /// hand both back for drawing. Current points stay until trimmed.
    pub fn rotate(&self) -> PointSnapshot {
        let mut generations = self.generations.lock();
        let Generations { current, previous } = &mut *generations;
        previous.clear();
        previous.extend_from_slice(current);

        PointSnapshot {
            current: current.clone(),
            previous: previous.clone(),
        }
    }

    pub fn current_len(&self) -> usize {
        self.generations.lock().current.len()
    }

    pub fn clear(&self) {
        let mut generations = self.generations.lock();
        generations.current.clear();
        generations.previous.clear();
    }
}

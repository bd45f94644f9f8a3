//! Append-only checkpoint history with bounded block-height search.
//!
//! One [`CheckpointList`] backs the global curve and every account curve;
//! the owner is identified externally (see
//! [`LedgerOwner`](veldt_core::types::LedgerOwner)).

use veldt_core::constants::MAX_SEARCH_STEPS;
use veldt_core::types::Point;

/// An append-only sequence of immutable checkpoints.
///
/// Points are appended in non-decreasing `(ts, block)` order; repeated
/// same-moment operations may append several points with identical
/// coordinates. Nothing is ever mutated or removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct CheckpointList {
    points: Vec<Point>,
}

impl CheckpointList {
    /// An empty history.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Number of points appended so far. The most recent point, if any,
    /// sits at index `epoch() - 1`.
    pub fn epoch(&self) -> u64 {
        self.points.len() as u64
    }

    /// Whether no point has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The most recently appended point.
    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    /// Point at a 0-based index.
    pub fn get(&self, index: u64) -> Option<&Point> {
        self.points.get(index as usize)
    }

    /// Append a point. Callers must not decrease `(ts, block)`.
    pub fn append(&mut self, point: Point) {
        debug_assert!(
            self.points
                .last()
                .is_none_or(|p| p.ts <= point.ts && p.block <= point.block),
            "checkpoint appended out of order"
        );
        self.points.push(point);
    }

    /// Latest point whose block height does not exceed `block`, with its
    /// index. Ties at the same block resolve to the most recently
    /// appended point. Returns `None` for pre-genesis targets.
    ///
    /// Binary search bounded at [`MAX_SEARCH_STEPS`] iterations, enough
    /// for any representable history length.
    pub fn find_by_block(&self, block: u64) -> Option<(u64, &Point)> {
        let first = self.points.first()?;
        if first.block > block {
            return None;
        }
        // Invariant: points[lo].block <= block; answer is in [lo, hi].
        let mut lo = 0usize;
        let mut hi = self.points.len() - 1;
        for _ in 0..MAX_SEARCH_STEPS {
            if lo >= hi {
                break;
            }
            let mid = (lo + hi + 1) / 2;
            if self.points[mid].block <= block {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        Some((lo as u64, &self.points[lo]))
    }
}

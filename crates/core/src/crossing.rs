//! Line-crossing detection and the per-session crossed set.
//!
//! "Crossing" means a centroid came within [`CROSSING_DISTANCE_PX`] of the
//! infinite line through the user's segment. Each key is counted once; the
//! set only grows until an explicit reset.

use std::collections::HashSet;
use std::fmt;

use crate::geometry::{point_line_distance, LineSegment, Point};
use crate::types::{FrameNumber, IdentityId};

/// Distance (exclusive) at which a centroid counts as crossing.
pub const CROSSING_DISTANCE_PX: f64 = 30.0;

/// `true` when `point` is strictly closer than [`CROSSING_DISTANCE_PX`] to
/// the line. A degenerate line is never near anything.
pub fn is_near_line(point: Point, line: &LineSegment) -> bool {
    point_line_distance(point, line).is_some_and(|d| d < CROSSING_DISTANCE_PX)
}

/// Key under which a crossing is recorded.
///
/// Webcam sessions track people across frames and key by identity. Video and
/// single-frame analysis have no stable identities, so the key is the frame
/// number plus the 1-based position of the detection within that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrossingKey {
    Tracked(IdentityId),
    Positional { frame_number: FrameNumber, index: u64 },
}

impl fmt::Display for CrossingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossingKey::Tracked(id) => write!(f, "{id}"),
            CrossingKey::Positional {
                frame_number,
                index,
            } => write!(f, "{frame_number}_{index}"),
        }
    }
}

/// Crossing line plus the set of keys that have crossed it.
#[derive(Debug, Clone, Default)]
pub struct CrossingCounter {
    line: Option<LineSegment>,
    crossed: HashSet<CrossingKey>,
}

impl CrossingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self) -> Option<&LineSegment> {
        self.line.as_ref()
    }

    /// Replace the crossing line. `None` removes it. The crossed set is kept.
    pub fn set_line(&mut self, line: Option<LineSegment>) {
        self.line = line;
    }

    /// Record `key` as crossed. Returns `true` if it was not already present.
    pub fn record(&mut self, key: CrossingKey) -> bool {
        self.crossed.insert(key)
    }

    /// Record `key` if a line is set and `point` is near it.
    ///
    /// Returns `true` only for a newly recorded crossing.
    pub fn observe(&mut self, point: Point, key: CrossingKey) -> bool {
        match &self.line {
            Some(line) if is_near_line(point, line) => self.record(key),
            _ => false,
        }
    }

    pub fn crossed_count(&self) -> usize {
        self.crossed.len()
    }

    pub fn has_crossed(&self, key: &CrossingKey) -> bool {
        self.crossed.contains(key)
    }

    /// Clear the crossed set, keeping the line.
    pub fn reset(&mut self) {
        self.crossed.clear();
    }

    /// Clear both the crossed set and the line.
    pub fn reset_all(&mut self) {
        self.crossed.clear();
        self.line = None;
    }
}

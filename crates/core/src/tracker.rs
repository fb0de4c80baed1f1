//! Frame-to-frame identity assignment by centroid distance gating.
//!
//! Each detection centroid is matched to the first tracked identity (in
//! insertion order) whose last centroid lies strictly within
//! [`MATCH_DISTANCE_PX`]. Unmatched centroids get a fresh identity.
//! Identities not seen in a frame are evicted immediately, so a person
//! occluded for a single frame comes back with a new id.

use indexmap::IndexMap;

use crate::geometry::Point;
use crate::types::IdentityId;

/// Maximum centroid displacement (exclusive) to keep an identity.
pub const MATCH_DISTANCE_PX: f64 = 100.0;

/// Identity tracker state for one session.
#[derive(Debug, Clone)]
pub struct IdentityTracker {
    tracked: IndexMap<IdentityId, Point>,
    next_identity: IdentityId,
}

impl Default for IdentityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self {
            tracked: IndexMap::new(),
            next_identity: 1,
        }
    }

    /// Assign an identity to `centroid`, updating or creating a track.
    ///
    /// Takes the first match in insertion order, not the nearest one.
    pub fn assign(&mut self, centroid: Point) -> IdentityId {
        let matched = self
            .tracked
            .iter_mut()
            .find(|(_, last)| centroid.distance_to(last) < MATCH_DISTANCE_PX);

        if let Some((&id, last)) = matched {
            *last = centroid;
            return id;
        }

        let id = self.next_identity;
        self.next_identity += 1;
        self.tracked.insert(id, centroid);
        id
    }

    /// Drop every identity that is not in `detected`.
    pub fn retain_detected(&mut self, detected: &[IdentityId]) {
        self.tracked.retain(|id, _| detected.contains(id));
    }

    /// Assign identities to all centroids of one frame, then evict unseen
    /// identities. Returns ids in the same order as `centroids`.
    pub fn track_frame(&mut self, centroids: &[Point]) -> Vec<IdentityId> {
        let ids: Vec<IdentityId> = centroids.iter().map(|c| self.assign(*c)).collect();
        self.retain_detected(&ids);
        ids
    }

    /// Forget all tracks and restart numbering at 1.
    pub fn reset(&mut self) {
        self.tracked.clear();
        self.next_identity = 1;
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Last known centroid of `id`, if it is still tracked.
    pub fn centroid_of(&self, id: IdentityId) -> Option<Point> {
        self.tracked.get(&id).copied()
    }

    /// The identity the next unmatched detection will receive.
    pub fn next_identity(&self) -> IdentityId {
        self.next_identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_detection_gets_identity_one() {
        let mut tracker = IdentityTracker::new();
        assert_eq!(tracker.assign(Point::new(10.0, 10.0)), 1);
        assert_eq!(tracker.next_identity(), 2);
    }

    #[test]
    fn small_moves_keep_identity() {
        let mut tracker = IdentityTracker::new();
        let mut pos = Point::new(0.0, 0.0);
        let first = tracker.track_frame(&[pos]);
        for _ in 0..20 {
            pos = Point::new(pos.x + 99.0, pos.y);
            assert_eq!(tracker.track_frame(&[pos]), first);
        }
        assert_eq!(tracker.centroid_of(first[0]), Some(pos));
    }

    #[test]
    fn move_of_exactly_threshold_mints_new_identity() {
        let mut tracker = IdentityTracker::new();
        assert_eq!(tracker.track_frame(&[Point::new(0.0, 0.0)]), vec![1]);
        assert_eq!(tracker.track_frame(&[Point::new(100.0, 0.0)]), vec![2]);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.centroid_of(1), None);
    }

    #[test]
    fn first_match_wins_over_nearest() {
        let mut tracker = IdentityTracker::new();
        // Two tracks far apart so both get their own identity.
        assert_eq!(tracker.track_frame(&[Point::new(0.0, 0.0), Point::new(150.0, 0.0)]), vec![1, 2]);
        // 90 px from track 1, 60 px from track 2: track 1 is found first.
        assert_eq!(tracker.assign(Point::new(90.0, 0.0)), 1);
    }

    #[test]
    fn empty_frame_evicts_everything() {
        let mut tracker = IdentityTracker::new();
        tracker.track_frame(&[Point::new(0.0, 0.0), Point::new(500.0, 500.0)]);
        assert_eq!(tracker.len(), 2);
        assert!(tracker.track_frame(&[]).is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn identities_are_never_reused() {
        let mut tracker = IdentityTracker::new();
        tracker.track_frame(&[Point::new(0.0, 0.0)]);
        tracker.track_frame(&[]);
        assert_eq!(tracker.track_frame(&[Point::new(0.0, 0.0)]), vec![2]);
    }

    #[test]
    fn reset_restarts_numbering() {
        let mut tracker = IdentityTracker::new();
        tracker.track_frame(&[Point::new(0.0, 0.0), Point::new(500.0, 0.0)]);
        tracker.reset();
        assert!(tracker.is_empty());
        assert_eq!(tracker.assign(Point::new(0.0, 0.0)), 1);
    }
}

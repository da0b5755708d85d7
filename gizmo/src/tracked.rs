//! Tracked points: caller-registered world points that move rigidly with the
//! manipulated nodes.
//!
//! A tracked point belongs to no group. At drag start the live positions are
//! captured as a baseline; every step recomputes each live position from that
//! baseline so repeated steps never accumulate error.

#[cfg(test)]
#[path = "tracked_test.rs"]
mod tracked_test;

use glam::{DMat3, DVec3};
use uuid::Uuid;

use crate::math::rotate_point;
use crate::snapshot::TrackedPointRecord;

/// Unique identifier for a tracked point.
pub type TrackedPointId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPoint {
    pub id: TrackedPointId,
    /// Position at registration.
    pub original: DVec3,
    /// Current position.
    pub live: DVec3,
}

#[derive(Debug, Default)]
pub struct TrackedPoints {
    points: Vec<TrackedPoint>,
    /// Live positions at drag start, parallel to `points`.
    baseline: Vec<DVec3>,
}

impl TrackedPoints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, position: DVec3) -> TrackedPointId {
        let id = Uuid::new_v4();
        self.points.push(TrackedPoint { id, original: position, live: position });
        self.baseline.push(position);
        id
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.baseline.clear();
    }

    #[must_use]
    pub fn get(&self, id: &TrackedPointId) -> Option<TrackedPoint> {
        self.points.iter().find(|p| p.id == *id).copied()
    }

    /// Every point, in registration order.
    #[must_use]
    pub fn all(&self) -> &[TrackedPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Capture the current live positions as the drag baseline.
    pub fn begin(&mut self) {
        self.baseline = self.points.iter().map(|p| p.live).collect();
    }

    /// Set each live position to `pivot + R·(baseline − pivot) + translation`.
    pub fn apply(&mut self, pivot: DVec3, rotation: &DMat3, translation: DVec3) {
        for (point, base) in self.points.iter_mut().zip(&self.baseline) {
            point.live = rotate_point(*base, pivot, rotation) + translation;
        }
    }

    /// Return every live position to the drag baseline.
    pub fn restore(&mut self) {
        for (point, base) in self.points.iter_mut().zip(&self.baseline) {
            point.live = *base;
        }
    }

    #[must_use]
    pub fn records(&self) -> Vec<TrackedPointRecord> {
        self.points
            .iter()
            .map(|p| TrackedPointRecord { id: p.id, original: p.original, live: p.live })
            .collect()
    }

    pub fn restore_records(&mut self, records: Vec<TrackedPointRecord>) {
        self.points = records
            .into_iter()
            .map(|r| TrackedPoint { id: r.id, original: r.original, live: r.live })
            .collect();
        self.begin();
    }
}

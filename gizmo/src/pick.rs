//! Handle picking: which handle, if any, lies under the pointer.
//!
//! Picking is restricted to the handle overlay; scene geometry never
//! produces a hit.

#[cfg(test)]
#[path = "pick_test.rs"]
mod pick_test;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::handle::HandleId;
use crate::viewport::ScreenPoint;

/// Result of a successful pick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickHit {
    pub handle_id: HandleId,
    /// World position of the hit, when the picker knows it.
    #[serde(default)]
    pub position: Option<DVec3>,
}

/// Hit-tests the handle overlay.
pub trait Picker: Send + Sync {
    fn pick_handle(&self, screen: ScreenPoint) -> Option<PickHit>;
}

/// Picker that answers from a queue of pre-armed hits.
///
/// Each pick consumes one armed hit; an empty queue is a miss. Used for
/// replaying recorded interactions and in tests.
#[derive(Debug, Default)]
pub struct QueuedPicker {
    queue: Mutex<VecDeque<PickHit>>,
}

impl QueuedPicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a hit for the next pick.
    pub fn arm(&self, hit: PickHit) {
        self.lock().push_back(hit);
    }

    /// Queue a hit on `handle_id` with no position.
    pub fn arm_handle(&self, handle_id: HandleId) {
        self.arm(PickHit { handle_id, position: None });
    }

    /// Drop every pending hit.
    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PickHit>> {
        match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Picker for QueuedPicker {
    fn pick_handle(&self, _screen: ScreenPoint) -> Option<PickHit> {
        self.lock().pop_front()
    }
}

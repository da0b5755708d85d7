//! Manipulation lifecycle notifications.
//!
//! Every drag produces exactly one `Started`, zero or more `Updated` and at
//! most one `Ended` (none when the drag is cancelled). Delivery is
//! best-effort: a subscriber whose buffer is full misses the event, and a
//! subscriber whose receiver was dropped is pruned.

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use glam::DMat4;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::handle::{GroupId, HandleId, ManipulationKind};
use crate::scene::NodeId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ManipulationEvent {
    Started {
        kind: ManipulationKind,
        handle_id: HandleId,
        group_id: GroupId,
        node_ids: Vec<NodeId>,
        initial: Vec<DMat4>,
    },
    Updated {
        kind: ManipulationKind,
        node_ids: Vec<NodeId>,
        initial: Vec<DMat4>,
        current: Vec<DMat4>,
    },
    Ended {
        kind: ManipulationKind,
        node_ids: Vec<NodeId>,
        initial: Vec<DMat4>,
        final_transforms: Vec<DMat4>,
    },
}

impl ManipulationEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Updated { .. } => "updated",
            Self::Ended { .. } => "ended",
        }
    }
}

/// Fan-out of events to bounded subscriber channels.
#[derive(Debug)]
pub struct EventBus {
    capacity: usize,
    subscribers: Vec<mpsc::Sender<ManipulationEvent>>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), subscribers: Vec::new() }
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<ManipulationEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.push(tx);
        rx
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn publish(&mut self, event: &ManipulationEvent) {
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(event = event.name(), "event subscriber full; dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

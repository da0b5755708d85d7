//! Handle overlay: fire-and-forget commands for handle visuals.
//!
//! Mesh construction and drawing live outside this crate. The registry only
//! tells the overlay where each handle should appear; issuing a command never
//! waits for the visual to update.

#[cfg(test)]
#[path = "overlay_test.rs"]
mod overlay_test;

use tokio::sync::mpsc;
use tracing::debug;

use crate::handle::{HandleId, HandlePlacement};

/// Sink for handle visual updates.
pub trait HandleOverlay: Send + Sync {
    /// Move/orient one handle visual.
    fn place(&self, placement: HandlePlacement);

    /// Drop one handle visual.
    fn remove(&self, handle_id: HandleId);

    /// Show or hide the whole overlay.
    fn set_visible(&self, visible: bool);
}

/// A command emitted by [`ChannelOverlay`].
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCommand {
    Place(HandlePlacement),
    Remove(HandleId),
    SetVisible(bool),
}

/// Overlay that forwards every command over an unbounded channel.
///
/// The receiving side (a renderer, or a test) drains commands at its own pace.
#[derive(Debug, Clone)]
pub struct ChannelOverlay {
    tx: mpsc::UnboundedSender<OverlayCommand>,
}

impl ChannelOverlay {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OverlayCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, command: OverlayCommand) {
        if self.tx.send(command).is_err() {
            debug!("overlay receiver dropped; discarding command");
        }
    }
}

impl HandleOverlay for ChannelOverlay {
    fn place(&self, placement: HandlePlacement) {
        self.send(OverlayCommand::Place(placement));
    }

    fn remove(&self, handle_id: HandleId) {
        self.send(OverlayCommand::Remove(handle_id));
    }

    fn set_visible(&self, visible: bool) {
        self.send(OverlayCommand::SetVisible(visible));
    }
}

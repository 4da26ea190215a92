//! Typed scene events and the sinks that receive them.
//!
//! Components hold an `Rc<dyn EventSink>` handed to them at construction;
//! there is no global bus.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};

use serde::Serialize;

use crate::scene::NodeId;

use super::camera::CameraPreset;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneEvent {
    Hover { node: NodeId, entity_id: String },
    Unhover { node: NodeId },
    ClickResolved { node: NodeId, entity_id: String },
    SelectionCleared,
    TreeBuilt {
        interactive: usize,
        nodes: usize,
        skipped: usize,
        issues: usize,
    },
    TransitionFinished { preset: CameraPreset },
}

impl SceneEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hover { .. } => "hover",
            Self::Unhover { .. } => "unhover",
            Self::ClickResolved { .. } => "click_resolved",
            Self::SelectionCleared => "selection_cleared",
            Self::TreeBuilt { .. } => "tree_built",
            Self::TransitionFinished { .. } => "transition_finished",
        }
    }
}

pub trait EventSink {
    fn publish(&self, event: SceneEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: SceneEvent) {}
}

/// Fans events out to every live subscriber channel.
#[derive(Debug, Default)]
pub struct ChannelSink {
    senders: RefCell<Vec<Sender<SceneEvent>>>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<SceneEvent> {
        let (tx, rx) = mpsc::channel();
        self.senders.borrow_mut().push(tx);
        rx
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.senders.borrow().len()
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: SceneEvent) {
        // Receivers that were dropped are forgotten on the next publish.
        self.senders
            .borrow_mut()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Buffers events for later draining. Clones share the buffer.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<SceneEvent>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every buffered event, oldest first.
    pub fn drain(&self) -> Vec<SceneEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    #[must_use]
    pub fn events(&self) -> Vec<SceneEvent> {
        self.events.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: SceneEvent) {
        self.events.borrow_mut().push(event);
    }
}

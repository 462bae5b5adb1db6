//! Change notifications between pipeline objects, vis elements and scene
//! nodes.

use crate::data::DataVisRef;
use crate::pipeline::PipelineObjectRef;
use crossbeam_channel::{Receiver, Sender};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceEvent {
    /// The referenced object's output changed.
    TargetChanged,
    /// The referenced object was deleted.
    TargetDeleted,
    TitleChanged,
    /// The pipeline structure or its output changed.
    PipelineChanged,
    AnimationFramesChanged,
    /// A cheaper preliminary state can be shown; no recomputation needed.
    PreliminaryStateAvailable,
}

/// Origin of an incoming event.
#[derive(Clone, Copy)]
pub enum EventSource<'a> {
    PipelineObject(&'a PipelineObjectRef),
    VisElement(&'a DataVisRef),
}

/// Subscribers to a scene node's outgoing events.
#[derive(Default)]
pub struct Dependents {
    subscribers: Mutex<Vec<Sender<ReferenceEvent>>>,
}

impl Dependents {
    pub fn subscribe(&self) -> Receiver<ReferenceEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Sends `event` to every live subscriber and forgets disconnected ones.
    pub fn notify(&self, event: ReferenceEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event).is_ok());
        tracing::trace!("Notified {} dependents of {:?}", subscribers.len(), event);
    }

    pub fn len(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub mod events;

use self::events::InputEvent;
use crate::time::Millis;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Key events from any producer thread, consumed by the session between ticks.
pub struct InputQueue {
    sender: Sender<InputEvent>,
    receiver: Receiver<InputEvent>,
    /// Received but stamped after the last drain point.
    deferred: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            deferred: Vec::new(),
        }
    }

    /// Can be called from any thread holding a [`sender`](Self::sender) clone as well.
    pub fn push(&self, event: InputEvent) {
        let _ = self.sender.send(event);
    }

    /// Non-blocking. Takes every event stamped at or before `now`, oldest first.
    /// Events stamped later stay queued for a later drain.
    pub fn drain_until(&mut self, now: Millis) -> Vec<InputEvent> {
        self.deferred.extend(self.receiver.try_iter());
        // stable: events with equal stamps keep arrival order
        self.deferred.sort_by_key(|e| e.timestamp);
        let ready = self.deferred.partition_point(|e| e.timestamp <= now);
        self.deferred.drain(..ready).collect()
    }

    pub fn len(&self) -> usize {
        self.deferred.len() + self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sender(&self) -> Sender<InputEvent> {
        self.sender.clone()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

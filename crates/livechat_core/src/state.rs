use std::time::Duration;

use crate::{ChatMessage, ListenerConfig, Pacer, SeenIds};

/// Dedup and pacing state owned by one listener.
///
/// Pure: the caller performs the fetch and notification, this type decides
/// which messages are new and how long to wait before the next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    seen: SeenIds,
    pacer: Pacer,
}

impl PollState {
    pub fn new(config: &ListenerConfig) -> Self {
        let config = config.clone().validated();
        Self {
            seen: SeenIds::with_capacity(config.max_stored_ids),
            pacer: Pacer::new(config.interval, config.max_interval, config.dynamic_polling),
        }
    }

    /// Records `message` as seen if it is well formed and new.
    ///
    /// Returns `true` when the message should be delivered. Callers admit and
    /// deliver one message at a time, in snapshot order.
    pub fn admit(&mut self, message: &ChatMessage) -> bool {
        message.is_well_formed() && self.seen.insert(&message.id)
    }

    /// Closes a tick that produced `new_messages` and returns the delay
    /// before the next one. A failed fetch counts as zero new messages.
    pub fn finish_tick(&mut self, new_messages: usize) -> Duration {
        self.pacer.record(new_messages)
    }

    pub fn set_dynamic_polling(&mut self, enabled: bool) {
        self.pacer.set_dynamic(enabled);
    }

    pub fn current_interval(&self) -> Duration {
        self.pacer.current()
    }

    pub fn is_dynamic(&self) -> bool {
        self.pacer.is_dynamic()
    }

    pub fn seen(&self) -> &SeenIds {
        &self.seen
    }
}

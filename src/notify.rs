use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Change;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub with one channel per coach or player id.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Change>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to changes concerning `id`. Creates the channel if needed.
    pub fn subscribe(&self, id: Ulid) -> broadcast::Receiver<Change> {
        let sender = self
            .channels
            .entry(id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Fire-and-forget. No-op if nobody is listening.
    pub fn send(&self, id: Ulid, change: &Change) {
        if let Some(sender) = self.channels.get(&id) {
            let _ = sender.send(change.clone());
        }
    }

    /// Drop the channel once its last subscriber has gone.
    pub fn prune(&self, id: &Ulid) {
        self.channels.remove_if(id, |_, sender| sender.receiver_count() == 0);
    }
}

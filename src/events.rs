use std::sync::Arc;
use tokio::sync::broadcast;

/// Lifecycle notifications published by the pipeline and the cleaner.
/// Ancillary consumers (stats collectors, admin notifiers) subscribe
/// without being wired into the forwarding path.
#[derive(Debug, Clone)]
pub enum Event {
    MessageReceived {
        feed_id: i64,
        message_id: i64,
    },
    MessageForwarded {
        subscriber_id: i64,
        feed_id: i64,
        message_id: i64,
    },
    ForwardFailed {
        subscriber_id: i64,
        feed_id: i64,
        message_id: i64,
    },
    DailyLimitReached {
        subscriber_id: i64,
    },
    ForwardLogCleaned {
        removed: usize,
    },
}

/// Fan-out bus over a tokio broadcast channel. Publishing never blocks
/// the publisher; slow subscribers lag and drop the oldest events.
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity);

        Arc::new(Self { sender })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// A send error only means nobody is subscribed right now, which is
    /// the normal state for an optional bus.
    pub fn publish(&self, event: Event) {
        log::debug!("Event: {:?}", event);

        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

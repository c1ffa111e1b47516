//! Message change feed
//!
//! Models the store's change-notification channel: every committed message
//! insert is published here, and views subscribe with a conversation filter.
//! Feeding synthetic events through a subscription is how the reconciler is
//! tested without a live backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::repositories::message::Message;

/// Size of the broadcast buffer before slow subscribers start missing events.
const FEED_BUFFER_SIZE: usize = 256;

/// A change event emitted by the store. Messages are append-only, so
/// insertion is the only kind.
#[derive(Debug, Clone)]
pub enum MessageEvent {
    Inserted(Message),
}

impl MessageEvent {
    /// The conversation the event belongs to
    pub fn chat_id(&self) -> &str {
        match self {
            MessageEvent::Inserted(message) => &message.chat_id,
        }
    }
}

/// Fan-out of message insertion events to per-conversation subscribers
#[derive(Clone)]
pub struct MessageFeed {
    tx: broadcast::Sender<MessageEvent>,
    opened: Arc<AtomicU64>,
}

impl MessageFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_BUFFER_SIZE);
        Self {
            tx,
            opened: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish an event. Having no live subscribers is not an error.
    pub fn publish(&self, event: MessageEvent) {
        let _ = self.tx.send(event);
    }

    /// Open a subscription scoped to one conversation
    pub fn subscribe(&self, chat_id: impl Into<String>) -> FeedSubscription {
        let chat_id = chat_id.into();
        self.opened.fetch_add(1, Ordering::Relaxed);
        debug!("Opened feed subscription for chat {}", chat_id);
        FeedSubscription {
            chat_id,
            rx: self.tx.subscribe(),
        }
    }

    /// Number of currently live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total subscriptions opened over the feed's lifetime
    pub fn subscriptions_opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }
}

impl Default for MessageFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription bound to one conversation. Dropping it releases the
/// underlying channel receiver.
pub struct FeedSubscription {
    chat_id: String,
    rx: broadcast::Receiver<MessageEvent>,
}

impl FeedSubscription {
    /// The conversation this subscription is bound to
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Receive the next event for the subscribed conversation.
    ///
    /// Events for other conversations are filtered out here, matching the
    /// server-side filter of the hosted feed. Returns `None` once the feed
    /// is closed.
    pub async fn recv(&mut self) -> Option<MessageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.chat_id() == self.chat_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "Feed subscription for chat {} lagged, {} events dropped",
                        self.chat_id, skipped
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<MessageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.chat_id() == self.chat_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(
                        "Feed subscription for chat {} lagged, {} events dropped",
                        self.chat_id, skipped
                    );
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}

//! Realtime push transport boundary.
//!
//! The engine consumes an insert-event feed scoped to a conversation id and
//! assumes nothing about delivery: no ordering, no at-most-once. Everything
//! received still passes through the reconciler. The WebSocket implementation
//! lives in [`ws`]; tests drive the trait with an in-process channel.

pub mod ws;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::{ConversationId, Message};

pub use ws::WsTransport;

/// Source of per-conversation message-insert events
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Open an event feed for one conversation.
    ///
    /// Dropping the returned subscription tears the feed down. Callers must
    /// drop any previous subscription before opening a new one; holding two
    /// feeds delivers unrelated conversations' events.
    async fn subscribe(&self, conversation: ConversationId) -> Result<RealtimeSubscription>;
}

/// Live event feed for one conversation; ends when dropped
pub struct RealtimeSubscription {
    conversation_id: ConversationId,
    events: mpsc::Receiver<Message>,
    worker: Option<JoinHandle<()>>,
}

impl RealtimeSubscription {
    /// Wrap a receiving channel; `worker` (the connection task, when there is
    /// one) is aborted when the subscription drops.
    #[must_use]
    pub const fn new(
        conversation_id: ConversationId,
        events: mpsc::Receiver<Message>,
        worker: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            conversation_id,
            events,
            worker,
        }
    }

    /// Channel-backed subscription without a connection task, for in-process
    /// transports and tests.
    #[must_use]
    pub fn channel(
        conversation_id: ConversationId,
        capacity: usize,
    ) -> (mpsc::Sender<Message>, Self) {
        let (sender, events) = mpsc::channel(capacity);
        (sender, Self::new(conversation_id, events, None))
    }

    /// The conversation this feed is scoped to
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Next pushed message, or `None` once the feed has closed
    pub async fn recv(&mut self) -> Option<Message> {
        self.events.recv().await
    }
}

impl Drop for RealtimeSubscription {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

//! The per-conversation engine actor.
//!
//! One task owns the message store; the optimistic sender, push listener, and
//! poll fetcher are producers into its command queue, so reconciliation is
//! serialized without locks. Opening a conversation tears the previous one
//! down first: in-flight work is aborted and the old push subscription is
//! dropped before the new one is opened.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::dto::OutgoingMessage;
use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{ConversationId, Message, MessageKind, UserId};
use crate::realtime::RealtimeTransport;
use crate::session::SessionProvider;

use super::reconcile::{reconcile, DeliverySource};
use super::store::MessageStore;

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 64;

/// Remote message operations the engine depends on.
///
/// `ApiClient` is the production implementation; tests drive the engine with
/// an in-memory fake.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Messages for a conversation, optionally only those newer than `after`
    async fn fetch_messages(
        &self,
        conversation: ConversationId,
        after: Option<i64>,
    ) -> Result<Vec<Message>>;

    /// Write one message and return its canonical form
    async fn send_message(
        &self,
        conversation: ConversationId,
        outgoing: &OutgoingMessage,
    ) -> Result<Message>;

    /// Mark the conversation read for the current user
    async fn mark_read(&self, conversation: ConversationId) -> Result<()>;
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn fetch_messages(
        &self,
        conversation: ConversationId,
        after: Option<i64>,
    ) -> Result<Vec<Message>> {
        Self::fetch_messages(self, conversation, after).await
    }

    async fn send_message(
        &self,
        conversation: ConversationId,
        outgoing: &OutgoingMessage,
    ) -> Result<Message> {
        Self::send_message(self, conversation, outgoing).await
    }

    async fn mark_read(&self, conversation: ConversationId) -> Result<()> {
        self.mark_conversation_read(conversation).await
    }
}

/// Immutable view of the canonical conversation state after a mutation
#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    /// The conversation this snapshot belongs to
    pub conversation_id: ConversationId,
    /// Ordered, deduplicated message list
    pub messages: Vec<Message>,
    /// Preview of the newest message
    pub last_message: Option<String>,
    /// Timestamp of the newest message
    pub last_message_at: Option<DateTime<Utc>>,
    /// Messages not yet read by the current user
    pub unread_count: u32,
}

/// What the engine reports to its observers
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// The canonical message list changed
    Updated(ChatSnapshot),
    /// An optimistic send failed and was rolled back; the draft is handed
    /// back so the composer can restore it. Emitted once per failed send.
    SendFailed {
        /// Human-readable failure reason
        reason: String,
        /// The text the user typed
        draft: String,
    },
}

enum Command {
    Send {
        message: Message,
        draft: String,
    },
    SendResolved {
        local_id: Uuid,
        draft: String,
        result: Result<Message>,
    },
    Pushed(Message),
    PollTick,
    PollFinished(Result<Vec<Message>>),
    MarkRead,
    Snapshot(oneshot::Sender<ChatSnapshot>),
}

/// Entry point for the messaging engine: owns at most one live conversation
/// at a time and guarantees clean teardown when switching.
pub struct ChatClient {
    backend: Arc<dyn ChatBackend>,
    transport: Arc<dyn RealtimeTransport>,
    session: Arc<dyn SessionProvider>,
    config: ClientConfig,
    active: Option<ChatHandle>,
}

impl ChatClient {
    /// Build a client over the given collaborators
    #[must_use]
    pub const fn new(
        backend: Arc<dyn ChatBackend>,
        transport: Arc<dyn RealtimeTransport>,
        session: Arc<dyn SessionProvider>,
        config: ClientConfig,
    ) -> Self {
        Self {
            backend,
            transport,
            session,
            config,
            active: None,
        }
    }

    /// Open a conversation, loading its history and wiring all three delivery
    /// sources. Any previously active conversation is torn down first: its
    /// in-flight requests are aborted and its push subscription dropped
    /// before the new one is opened.
    pub async fn open(&mut self, conversation: ConversationId) -> Result<&ChatHandle> {
        self.close();
        let handle = ChatHandle::spawn(
            conversation,
            Arc::clone(&self.backend),
            Arc::clone(&self.transport),
            &self.session,
            &self.config,
        )
        .await?;
        Ok(self.active.insert(handle))
    }

    /// The currently open conversation, if any
    #[must_use]
    pub const fn active(&self) -> Option<&ChatHandle> {
        self.active.as_ref()
    }

    /// Tear down the active conversation
    pub fn close(&mut self) {
        self.active = None;
    }
}

/// Handle to one live conversation's engine actor.
///
/// Dropping the handle aborts the actor, the poll ticker, and the push
/// forwarder, which in turn drops the realtime subscription.
pub struct ChatHandle {
    conversation_id: ConversationId,
    self_id: UserId,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<ChatEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChatHandle {
    async fn spawn(
        conversation: ConversationId,
        backend: Arc<dyn ChatBackend>,
        transport: Arc<dyn RealtimeTransport>,
        session: &Arc<dyn SessionProvider>,
        config: &ClientConfig,
    ) -> Result<Self> {
        let self_id = session.current_user()?;

        // Initial load is a foreground operation: a failure here surfaces to
        // the caller instead of being swallowed like background poll errors.
        let history = timeout(
            config.fetch_timeout(),
            backend.fetch_messages(conversation, None),
        )
        .await
        .map_err(|_| Error::NetworkTimeout(format!("initial load of {conversation} timed out")))??;

        let unread = history
            .iter()
            .filter(|message| !message.is_read && message.sender_id != self_id)
            .count();
        let mut store = MessageStore::with_history(conversation, history);
        store.set_unread_count(u32::try_from(unread).unwrap_or(u32::MAX));

        // Push is best-effort: the poll fetcher masks transport gaps, so a
        // failed subscription degrades to poll-only instead of failing open.
        let subscription = match transport.subscribe(conversation).await {
            Ok(subscription) => Some(subscription),
            Err(error) => {
                warn!(%conversation, %error, "push subscription failed, relying on poll");
                None
            }
        };

        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(run_actor(
            store,
            command_rx,
            commands.clone(),
            events.clone(),
            Arc::clone(&backend),
            config.clone(),
            self_id,
        )));

        let poll_commands = commands.clone();
        let poll_period = config.poll_interval();
        tasks.push(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + poll_period, poll_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if poll_commands.send(Command::PollTick).await.is_err() {
                    break;
                }
            }
        }));

        if let Some(mut subscription) = subscription {
            let push_commands = commands.clone();
            tasks.push(tokio::spawn(async move {
                while let Some(message) = subscription.recv().await {
                    if push_commands.send(Command::Pushed(message)).await.is_err() {
                        break;
                    }
                }
            }));
        }

        Ok(Self {
            conversation_id: conversation,
            self_id,
            commands,
            events,
            tasks,
        })
    }

    /// The conversation this handle is bound to
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// The user this engine reconciles on behalf of
    #[must_use]
    pub const fn current_user(&self) -> UserId {
        self.self_id
    }

    /// Observe engine events; every observer sees every event from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Optimistically send a text message.
    ///
    /// The pending message appears in the store immediately; confirmation or
    /// rollback arrives later as an event.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("message text must not be empty".to_string()));
        }
        let message = Message::text(self.conversation_id, self.self_id, trimmed);
        self.dispatch(Command::Send {
            message,
            draft: text.to_string(),
        })
        .await
    }

    /// Optimistically send an attachment message (image, location, file)
    pub async fn send_attachment(
        &self,
        kind: MessageKind,
        caption: Option<String>,
    ) -> Result<()> {
        if matches!(kind, MessageKind::Text) {
            return Err(Error::Validation(
                "attachment sends require a non-text kind".to_string(),
            ));
        }
        let draft = caption.clone().unwrap_or_default();
        let message = Message::attachment(self.conversation_id, self.self_id, kind, caption);
        self.dispatch(Command::Send { message, draft }).await
    }

    /// Trigger an immediate catch-up poll (pull-to-refresh)
    pub async fn refresh(&self) -> Result<()> {
        self.dispatch(Command::PollTick).await
    }

    /// Mark the conversation read locally and remotely
    pub async fn mark_read(&self) -> Result<()> {
        self.dispatch(Command::MarkRead).await
    }

    /// Current canonical state
    pub async fn snapshot(&self) -> Result<ChatSnapshot> {
        let (reply, response) = oneshot::channel();
        self.dispatch(Command::Snapshot(reply)).await?;
        response
            .await
            .map_err(|_| Error::NetworkFailure("chat engine stopped".to_string()))
    }

    async fn dispatch(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::NetworkFailure("chat engine stopped".to_string()))
    }
}

impl Drop for ChatHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn snapshot_of(store: &MessageStore) -> ChatSnapshot {
    ChatSnapshot {
        conversation_id: store.conversation_id(),
        messages: store.messages().to_vec(),
        last_message: store.last_message().map(ToString::to_string),
        last_message_at: store.last_message_at(),
        unread_count: store.unread_count(),
    }
}

async fn run_actor(
    mut store: MessageStore,
    mut commands: mpsc::Receiver<Command>,
    loopback: mpsc::Sender<Command>,
    events: broadcast::Sender<ChatEvent>,
    backend: Arc<dyn ChatBackend>,
    config: ClientConfig,
    self_id: UserId,
) {
    let conversation = store.conversation_id();
    let mut poll_in_flight = false;

    while let Some(command) = commands.recv().await {
        match command {
            Command::Send { message, draft } => {
                let crate::models::MessageId::Local(local_id) = message.id else {
                    debug!(%conversation, "ignoring send of an already-canonical message");
                    continue;
                };
                let outgoing = OutgoingMessage::from_message(&message);
                reconcile(&mut store, message, DeliverySource::Local, self_id);
                let _ = events.send(ChatEvent::Updated(snapshot_of(&store)));

                let backend = Arc::clone(&backend);
                let loopback = loopback.clone();
                let deadline = config.send_timeout();
                tokio::spawn(async move {
                    // A dropped engine cancels the write in flight; the
                    // rollback alert is suppressed for this explicit
                    // cancellation, unlike timeouts and failures.
                    let result = tokio::select! {
                        () = loopback.closed() => return,
                        result = timeout(deadline, backend.send_message(conversation, &outgoing)) => {
                            result.unwrap_or_else(|_| {
                                Err(Error::NetworkTimeout(format!(
                                    "send to {conversation} timed out"
                                )))
                            })
                        }
                    };
                    let _ = loopback
                        .send(Command::SendResolved {
                            local_id,
                            draft,
                            result,
                        })
                        .await;
                });
            }
            Command::SendResolved {
                local_id,
                draft,
                result,
            } => match result {
                Ok(confirmed) => {
                    store.promote(local_id, confirmed);
                    let _ = events.send(ChatEvent::Updated(snapshot_of(&store)));
                }
                Err(error) => {
                    // Timeouts and failures roll back identically; the user
                    // is notified exactly once, with the draft handed back.
                    store.remove_local(local_id);
                    let _ = events.send(ChatEvent::Updated(snapshot_of(&store)));
                    let _ = events.send(ChatEvent::SendFailed {
                        reason: error.to_string(),
                        draft,
                    });
                }
            },
            Command::Pushed(message) => {
                if reconcile(&mut store, message, DeliverySource::Push, self_id).inserted() {
                    let _ = events.send(ChatEvent::Updated(snapshot_of(&store)));
                }
            }
            Command::PollTick => {
                if poll_in_flight {
                    continue;
                }
                poll_in_flight = true;
                let after = store.highest_canonical_id();
                let backend = Arc::clone(&backend);
                let loopback = loopback.clone();
                let deadline = config.fetch_timeout();
                tokio::spawn(async move {
                    let result = tokio::select! {
                        () = loopback.closed() => return,
                        result = timeout(deadline, backend.fetch_messages(conversation, after)) => {
                            result.unwrap_or_else(|_| {
                                Err(Error::NetworkTimeout(format!(
                                    "poll of {conversation} timed out"
                                )))
                            })
                        }
                    };
                    let _ = loopback.send(Command::PollFinished(result)).await;
                });
            }
            Command::PollFinished(result) => {
                poll_in_flight = false;
                match result {
                    Ok(batch) => {
                        let mut changed = false;
                        for message in batch {
                            changed |= reconcile(&mut store, message, DeliverySource::Poll, self_id)
                                .inserted();
                        }
                        if changed {
                            let _ = events.send(ChatEvent::Updated(snapshot_of(&store)));
                        }
                    }
                    // Poll failures must never interrupt the conversation;
                    // the next tick retries.
                    Err(error) => debug!(%conversation, %error, "catch-up poll failed"),
                }
            }
            Command::MarkRead => {
                store.mark_all_read();
                let _ = events.send(ChatEvent::Updated(snapshot_of(&store)));
                let backend = Arc::clone(&backend);
                tokio::spawn(async move {
                    if let Err(error) = backend.mark_read(conversation).await {
                        debug!(%conversation, %error, "remote read-marking failed");
                    }
                });
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(snapshot_of(&store));
            }
        }
    }
}

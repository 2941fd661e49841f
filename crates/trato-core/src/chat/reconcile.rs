//! Delivery reconciliation.
//!
//! Every message, whatever its source, passes through [`reconcile`] before it
//! reaches the store. The policy merges three partially-overlapping delivery
//! paths (optimistic local write, push event, catch-up poll) into one ordered,
//! duplicate-free sequence.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::{Message, MessageId, UserId};

use super::store::MessageStore;

/// Race window between an optimistic send and its echo arriving via push or
/// poll. A self-authored message younger than this is assumed to be the echo
/// of a pending send and is dropped. Heuristic, kept for compatibility with
/// the remote service's existing clients.
pub const RECENT_ECHO_WINDOW_SECS: i64 = 5;

/// Which adapter delivered a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverySource {
    /// The optimistic sender of this client
    Local,
    /// The realtime push feed
    Push,
    /// The periodic catch-up poll
    Poll,
}

impl DeliverySource {
    /// Whether the message came over the network rather than from this
    /// client's own optimistic write
    #[must_use]
    pub const fn is_remote(self) -> bool {
        matches!(self, Self::Push | Self::Poll)
    }
}

/// What the reconciler did with an incoming message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Accepted and inserted in canonical order
    Inserted,
    /// An id-equal message was already held
    DuplicateId,
    /// Push/poll echo of a message this client sent; a pending local message
    /// carries the same body
    SelfEcho,
    /// Self-authored message inside the optimistic race window while a send
    /// is still pending
    RecentSendRace,
}

impl ReconcileOutcome {
    /// Whether the store changed
    #[must_use]
    pub const fn inserted(self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// Merge one incoming message into the store.
///
/// `self_id` is the current user as seen by the delivering adapter; echoes of
/// this client's own sends are suppressed, duplicates dropped, and everything
/// accepted is re-sorted into ascending canonical order.
pub fn reconcile(
    store: &mut MessageStore,
    incoming: Message,
    source: DeliverySource,
    self_id: UserId,
) -> ReconcileOutcome {
    reconcile_at(store, incoming, source, self_id, Utc::now())
}

/// [`reconcile`] with an explicit clock, for deterministic tests.
pub(crate) fn reconcile_at(
    store: &mut MessageStore,
    incoming: Message,
    source: DeliverySource,
    self_id: UserId,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    match incoming.id {
        MessageId::Remote(id) if store.contains_canonical(id) => {
            return ReconcileOutcome::DuplicateId;
        }
        MessageId::Local(id) if store.contains_local(id) => {
            return ReconcileOutcome::DuplicateId;
        }
        _ => {}
    }

    if source.is_remote() && incoming.sender_id == self_id {
        if store.pending_matches_content(incoming.content.as_deref()) {
            debug!(
                message_id = %incoming.id,
                "suppressing self echo matching a pending send"
            );
            return ReconcileOutcome::SelfEcho;
        }
        let window = now - Duration::seconds(RECENT_ECHO_WINDOW_SECS);
        if incoming.sent_at > window && store.has_pending() {
            debug!(
                message_id = %incoming.id,
                "suppressing self-authored message inside the optimistic race window"
            );
            return ReconcileOutcome::RecentSendRace;
        }
    }

    let count_unread = source.is_remote() && incoming.sender_id != self_id;
    store.insert(incoming);
    if count_unread {
        store.note_remote_unread();
    }
    ReconcileOutcome::Inserted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::models::{ConversationId, MessageKind};

    const CONVERSATION: ConversationId = ConversationId(7);
    const ME: UserId = UserId(1);
    const OTHER: UserId = UserId(2);

    fn remote(id: i64, sender: UserId, content: &str, sent_at: DateTime<Utc>) -> Message {
        Message {
            id: MessageId::Remote(id),
            conversation_id: CONVERSATION,
            sender_id: sender,
            content: Some(content.to_string()),
            kind: MessageKind::Text,
            sent_at,
            is_read: false,
        }
    }

    #[test]
    fn reapplying_the_same_message_is_idempotent() {
        let mut store = MessageStore::new(CONVERSATION);
        let now = Utc::now();
        let message = remote(10, OTHER, "hola", now - Duration::seconds(60));

        assert_eq!(
            reconcile_at(&mut store, message.clone(), DeliverySource::Push, ME, now),
            ReconcileOutcome::Inserted
        );
        for _ in 0..3 {
            assert_eq!(
                reconcile_at(&mut store, message.clone(), DeliverySource::Poll, ME, now),
                ReconcileOutcome::DuplicateId
            );
        }
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn out_of_order_delivery_ends_sorted() {
        let mut store = MessageStore::new(CONVERSATION);
        let now = Utc::now();
        let old = now - Duration::seconds(120);

        for (id, source) in [
            (5, DeliverySource::Poll),
            (3, DeliverySource::Push),
            (4, DeliverySource::Poll),
        ] {
            reconcile_at(&mut store, remote(id, OTHER, "m", old), source, ME, now);
        }

        let ids: Vec<_> = store
            .messages()
            .iter()
            .filter_map(|message| message.id.canonical())
            .collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn self_echo_with_matching_pending_content_is_dropped() {
        let mut store = MessageStore::new(CONVERSATION);
        let now = Utc::now();
        let pending = Message::text(CONVERSATION, ME, "hello");
        reconcile_at(&mut store, pending, DeliverySource::Local, ME, now);

        // The poll catches the same send 2s later under its canonical id.
        let echo = remote(42, ME, "hello", now - Duration::seconds(2));
        assert_eq!(
            reconcile_at(&mut store, echo, DeliverySource::Poll, ME, now),
            ReconcileOutcome::SelfEcho
        );

        assert_eq!(store.messages().len(), 1);
        assert!(store.messages()[0].is_pending());
    }

    #[test]
    fn recent_self_message_is_dropped_while_a_send_is_pending() {
        let mut store = MessageStore::new(CONVERSATION);
        let now = Utc::now();
        reconcile_at(
            &mut store,
            Message::text(CONVERSATION, ME, "first draft"),
            DeliverySource::Local,
            ME,
            now,
        );

        // Different content, but self-authored and inside the 5s window.
        let echo = remote(42, ME, "first  draft", now - Duration::seconds(3));
        assert_eq!(
            reconcile_at(&mut store, echo, DeliverySource::Push, ME, now),
            ReconcileOutcome::RecentSendRace
        );
    }

    #[test]
    fn old_self_message_from_another_device_is_accepted() {
        let mut store = MessageStore::new(CONVERSATION);
        let now = Utc::now();
        reconcile_at(
            &mut store,
            Message::text(CONVERSATION, ME, "pending here"),
            DeliverySource::Local,
            ME,
            now,
        );

        let older = remote(41, ME, "sent elsewhere", now - Duration::seconds(30));
        assert_eq!(
            reconcile_at(&mut store, older, DeliverySource::Poll, ME, now),
            ReconcileOutcome::Inserted
        );
        assert_eq!(store.messages().len(), 2);
    }

    #[test]
    fn recent_self_message_without_pending_send_is_accepted() {
        let mut store = MessageStore::new(CONVERSATION);
        let now = Utc::now();

        let echo = remote(42, ME, "from my phone", now - Duration::seconds(1));
        assert_eq!(
            reconcile_at(&mut store, echo, DeliverySource::Push, ME, now),
            ReconcileOutcome::Inserted
        );
    }

    #[test]
    fn unread_counts_only_remote_foreign_messages() {
        let mut store = MessageStore::new(CONVERSATION);
        let now = Utc::now();
        let old = now - Duration::seconds(60);

        reconcile_at(
            &mut store,
            Message::text(CONVERSATION, ME, "mine"),
            DeliverySource::Local,
            ME,
            now,
        );
        reconcile_at(
            &mut store,
            remote(50, OTHER, "theirs", old),
            DeliverySource::Push,
            ME,
            now,
        );
        reconcile_at(
            &mut store,
            remote(49, OTHER, "earlier", old),
            DeliverySource::Poll,
            ME,
            now,
        );

        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn pending_send_survives_poll_echo_until_confirmation() {
        // The optimistic scenario: "hello" sent locally, echoed by the poll
        // under canonical id 42 within the window, then confirmed.
        let mut store = MessageStore::new(CONVERSATION);
        let now = Utc::now();
        let pending = Message::text(CONVERSATION, ME, "hello");
        let MessageId::Local(local_id) = pending.id else {
            panic!("expected local id");
        };
        reconcile_at(&mut store, pending, DeliverySource::Local, ME, now);

        let echo = remote(42, ME, "hello", now - Duration::seconds(2));
        assert!(!reconcile_at(&mut store, echo, DeliverySource::Poll, ME, now).inserted());
        assert!(store.contains_local(local_id));

        let confirmed = remote(42, ME, "hello", now);
        store.promote(local_id, confirmed);
        assert!(!store.has_pending());
        assert_eq!(store.highest_canonical_id(), Some(42));
        assert_eq!(store.messages().len(), 1);
    }
}

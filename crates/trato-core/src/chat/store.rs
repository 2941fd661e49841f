//! Ordered, deduplicated per-conversation message collection.
//!
//! The store is the only owner of a conversation's message list. All three
//! delivery sources mutate it through the reconciler; the invariant after
//! every mutation is ascending canonical-id order with pending local messages
//! trailing, ordered among themselves by creation time.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ConversationId, Message, MessageId};
use crate::util::preview_text;

const PREVIEW_LEN: usize = 80;

/// In-memory message list plus the caches derived from its tail
#[derive(Debug, Clone)]
pub struct MessageStore {
    conversation_id: ConversationId,
    messages: Vec<Message>,
    last_message: Option<String>,
    last_message_at: Option<DateTime<Utc>>,
    unread_count: u32,
}

impl MessageStore {
    /// Empty store for one conversation
    #[must_use]
    pub const fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            messages: Vec::new(),
            last_message: None,
            last_message_at: None,
            unread_count: 0,
        }
    }

    /// Store seeded with an initial history load (sorted on entry)
    #[must_use]
    pub fn with_history(conversation_id: ConversationId, messages: Vec<Message>) -> Self {
        let mut store = Self::new(conversation_id);
        store.messages = messages;
        store.messages.retain(|message| message.conversation_id == conversation_id);
        store.resort();
        store
    }

    /// The conversation this store belongs to
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// The canonical ordered message list
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Cached preview of the newest message
    #[must_use]
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Cached timestamp of the newest message
    #[must_use]
    pub const fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message_at
    }

    /// Messages not yet read by the current user
    #[must_use]
    pub const fn unread_count(&self) -> u32 {
        self.unread_count
    }

    /// Highest remotely-assigned id currently held; the poll fetcher asks for
    /// everything newer than this
    #[must_use]
    pub fn highest_canonical_id(&self) -> Option<i64> {
        self.messages
            .iter()
            .filter_map(|message| message.id.canonical())
            .max()
    }

    /// Whether a message with this canonical id is already present
    #[must_use]
    pub fn contains_canonical(&self, id: i64) -> bool {
        self.messages
            .iter()
            .any(|message| message.id.canonical() == Some(id))
    }

    /// Whether a pending local message with this placeholder id is present
    #[must_use]
    pub fn contains_local(&self, id: Uuid) -> bool {
        self.messages
            .iter()
            .any(|message| message.id == MessageId::Local(id))
    }

    /// Whether any pending local message is awaiting confirmation
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(Message::is_pending)
    }

    /// Whether a pending local message carries exactly this text body
    #[must_use]
    pub fn pending_matches_content(&self, content: Option<&str>) -> bool {
        content.is_some_and(|content| {
            self.messages
                .iter()
                .filter(|message| message.is_pending())
                .any(|message| message.content.as_deref() == Some(content))
        })
    }

    /// Insert a message and restore the ordering invariant.
    ///
    /// Callers go through the reconciler; this method applies no dedup policy
    /// of its own beyond re-sorting.
    pub fn insert(&mut self, message: Message) {
        self.messages.push(message);
        self.resort();
    }

    /// Replace a pending local message with its confirmed canonical form.
    ///
    /// Returns false when the placeholder is gone (already rolled back) or the
    /// canonical id is somehow present already; the confirmed message is then
    /// inserted only if its id is new.
    pub fn promote(&mut self, local_id: Uuid, confirmed: Message) -> bool {
        let duplicate = confirmed
            .id
            .canonical()
            .is_some_and(|id| self.contains_canonical(id));
        let Some(position) = self
            .messages
            .iter()
            .position(|message| message.id == MessageId::Local(local_id))
        else {
            if !duplicate {
                self.insert(confirmed);
            }
            return false;
        };
        if duplicate {
            self.messages.remove(position);
        } else {
            self.messages[position] = confirmed;
        }
        self.resort();
        true
    }

    /// Remove a pending local message after a failed send
    pub fn remove_local(&mut self, local_id: Uuid) -> Option<Message> {
        let position = self
            .messages
            .iter()
            .position(|message| message.id == MessageId::Local(local_id))?;
        let removed = self.messages.remove(position);
        self.resort();
        Some(removed)
    }

    /// Mark every message read and clear the unread counter
    pub fn mark_all_read(&mut self) {
        for message in &mut self.messages {
            message.is_read = true;
        }
        self.unread_count = 0;
    }

    /// Count one newly delivered remote message as unread
    pub(crate) fn note_remote_unread(&mut self) {
        self.unread_count = self.unread_count.saturating_add(1);
    }

    /// Seed the unread counter after an initial history load
    pub(crate) fn set_unread_count(&mut self, unread: u32) {
        self.unread_count = unread;
    }

    fn resort(&mut self) {
        self.messages.sort_by(compare_messages);
        self.refresh_tail_cache();
    }

    fn refresh_tail_cache(&mut self) {
        let tail = self.messages.last();
        self.last_message = tail.map(|message| preview_text(message.preview_source(), PREVIEW_LEN));
        self.last_message_at = tail.map(|message| message.sent_at);
    }
}

/// Total order over messages: canonical ids ascending, pending local messages
/// after every canonical one, locals among themselves by creation time (their
/// placeholder uuid breaks exact-timestamp ties deterministically).
fn compare_messages(a: &Message, b: &Message) -> Ordering {
    match (a.id, b.id) {
        (MessageId::Remote(x), MessageId::Remote(y)) => x.cmp(&y),
        (MessageId::Remote(_), MessageId::Local(_)) => Ordering::Less,
        (MessageId::Local(_), MessageId::Remote(_)) => Ordering::Greater,
        (MessageId::Local(x), MessageId::Local(y)) => {
            a.sent_at.cmp(&b.sent_at).then_with(|| x.cmp(&y))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    use crate::models::{MessageKind, UserId};

    const CONVERSATION: ConversationId = ConversationId(7);

    fn remote(id: i64, sender: i64, content: &str) -> Message {
        Message {
            id: MessageId::Remote(id),
            conversation_id: CONVERSATION,
            sender_id: UserId(sender),
            content: Some(content.to_string()),
            kind: MessageKind::Text,
            sent_at: Utc::now(),
            is_read: false,
        }
    }

    fn ids(store: &MessageStore) -> Vec<MessageId> {
        store.messages().iter().map(|message| message.id).collect()
    }

    #[test]
    fn insert_keeps_ascending_canonical_order() {
        let mut store = MessageStore::new(CONVERSATION);
        store.insert(remote(3, 1, "tres"));
        store.insert(remote(1, 1, "uno"));
        store.insert(remote(2, 2, "dos"));

        assert_eq!(
            ids(&store),
            vec![
                MessageId::Remote(1),
                MessageId::Remote(2),
                MessageId::Remote(3)
            ]
        );
    }

    #[test]
    fn locals_trail_canonicals_in_creation_order() {
        let mut store = MessageStore::new(CONVERSATION);
        let mut first = Message::text(CONVERSATION, UserId(1), "primero");
        let mut second = Message::text(CONVERSATION, UserId(1), "segundo");
        first.sent_at = Utc::now() - Duration::seconds(2);
        second.sent_at = Utc::now() - Duration::seconds(1);

        store.insert(second.clone());
        store.insert(remote(40, 2, "remoto"));
        store.insert(first.clone());

        assert_eq!(
            ids(&store),
            vec![MessageId::Remote(40), first.id, second.id]
        );
    }

    #[test]
    fn promote_replaces_placeholder_with_canonical() {
        let mut store = MessageStore::new(CONVERSATION);
        let pending = Message::text(CONVERSATION, UserId(1), "hola");
        let MessageId::Local(local_id) = pending.id else {
            panic!("expected local id");
        };
        store.insert(pending);
        store.insert(remote(43, 2, "despues"));

        let confirmed = remote(42, 1, "hola");
        assert!(store.promote(local_id, confirmed));

        assert_eq!(
            ids(&store),
            vec![MessageId::Remote(42), MessageId::Remote(43)]
        );
        assert!(!store.has_pending());
    }

    #[test]
    fn promote_drops_placeholder_when_canonical_already_arrived() {
        let mut store = MessageStore::new(CONVERSATION);
        let pending = Message::text(CONVERSATION, UserId(1), "hola");
        let MessageId::Local(local_id) = pending.id else {
            panic!("expected local id");
        };
        store.insert(pending);
        store.insert(remote(42, 1, "hola"));

        assert!(store.promote(local_id, remote(42, 1, "hola")));
        assert_eq!(ids(&store), vec![MessageId::Remote(42)]);
    }

    #[test]
    fn remove_local_rolls_back_a_failed_send() {
        let mut store = MessageStore::new(CONVERSATION);
        let pending = Message::text(CONVERSATION, UserId(1), "no llego");
        let MessageId::Local(local_id) = pending.id else {
            panic!("expected local id");
        };
        store.insert(pending);

        let removed = store.remove_local(local_id).unwrap();
        assert_eq!(removed.content.as_deref(), Some("no llego"));
        assert!(store.messages().is_empty());
        assert!(store.last_message().is_none());
    }

    #[test]
    fn tail_cache_tracks_newest_message() {
        let mut store = MessageStore::new(CONVERSATION);
        store.insert(remote(1, 1, "primero"));
        store.insert(remote(2, 2, "ultimo"));

        assert_eq!(store.last_message(), Some("ultimo"));
        assert_eq!(store.highest_canonical_id(), Some(2));
    }

    #[test]
    fn with_history_discards_foreign_conversations() {
        let mut stray = remote(9, 1, "ajeno");
        stray.conversation_id = ConversationId(99);
        let store = MessageStore::with_history(CONVERSATION, vec![remote(2, 1, "aqui"), stray]);

        assert_eq!(ids(&store), vec![MessageId::Remote(2)]);
    }

    #[test]
    fn mark_all_read_clears_unread() {
        let mut store = MessageStore::new(CONVERSATION);
        store.insert(remote(1, 2, "hola"));
        store.note_remote_unread();
        assert_eq!(store.unread_count(), 1);

        store.mark_all_read();
        assert_eq!(store.unread_count(), 0);
        assert!(store.messages().iter().all(|message| message.is_read));
    }
}

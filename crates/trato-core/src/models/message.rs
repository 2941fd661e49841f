//! Message model and identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{ConversationId, UserId};

/// Identifier for a chat message.
///
/// Canonical ids are assigned by the remote data service and increase
/// monotonically within a conversation. Local ids are client-only placeholders
/// carried by pending optimistic sends; they are replaced by the canonical id
/// once the remote write confirms, never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageId {
    /// Durable id assigned by the remote data service
    Remote(i64),
    /// Client-local placeholder for a pending optimistic send
    Local(Uuid),
}

impl MessageId {
    /// Create a fresh local placeholder id (UUID v7, time-sortable)
    #[must_use]
    pub fn local() -> Self {
        Self::Local(Uuid::now_v7())
    }

    /// The canonical numeric id, when this message has one
    #[must_use]
    pub const fn canonical(&self) -> Option<i64> {
        match self {
            Self::Remote(id) => Some(*id),
            Self::Local(_) => None,
        }
    }

    /// Whether this is a client-local placeholder
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(id) => write!(f, "{id}"),
            Self::Local(uuid) => write!(f, "local:{uuid}"),
        }
    }
}

/// Kind-specific payload carried by a message.
///
/// The remote service sends loosely-shaped metadata; it is parsed into these
/// tagged variants at the adapter boundary and trusted downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Plain text body (in `Message::content`)
    Text,
    /// Image attachment
    Image {
        /// Stable URL issued by the upload service
        url: String,
    },
    /// Shared map coordinates
    Location {
        latitude: f64,
        longitude: f64,
    },
    /// Generic file attachment
    File {
        /// Stable URL issued by the upload service
        url: String,
        /// Original file name
        name: String,
        /// Size in bytes, when known
        size: Option<u64>,
    },
}

impl MessageKind {
    /// Wire label for this kind, matching the remote service's schema
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image { .. } => "image",
            Self::Location { .. } => "location",
            Self::File { .. } => "file",
        }
    }
}

/// A chat message within one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Canonical or local placeholder identifier
    pub id: MessageId,
    /// Conversation this message belongs to
    pub conversation_id: ConversationId,
    /// Sender
    pub sender_id: UserId,
    /// Text body; `None` for non-text kinds without a caption
    pub content: Option<String>,
    /// Kind-specific payload
    pub kind: MessageKind,
    /// Remote-assigned send timestamp (client clock until confirmed)
    pub sent_at: DateTime<Utc>,
    /// Whether the current user has read this message
    pub is_read: bool,
}

impl Message {
    /// Create a pending local text message for an optimistic send
    #[must_use]
    pub fn text(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::local(),
            conversation_id,
            sender_id,
            content: Some(content.into()),
            kind: MessageKind::Text,
            sent_at: Utc::now(),
            is_read: true,
        }
    }

    /// Create a pending local attachment message for an optimistic send
    #[must_use]
    pub fn attachment(
        conversation_id: ConversationId,
        sender_id: UserId,
        kind: MessageKind,
        caption: Option<String>,
    ) -> Self {
        Self {
            id: MessageId::local(),
            conversation_id,
            sender_id,
            content: caption,
            kind,
            sent_at: Utc::now(),
            is_read: true,
        }
    }

    /// Whether this message is still awaiting remote confirmation
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.id.is_local()
    }

    /// Text shown in previews: the body, or a kind label for attachments
    #[must_use]
    pub fn preview_source(&self) -> &str {
        match self.content.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => self.kind.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_ids_are_unique() {
        assert_ne!(MessageId::local(), MessageId::local());
    }

    #[test]
    fn canonical_extraction() {
        assert_eq!(MessageId::Remote(42).canonical(), Some(42));
        assert_eq!(MessageId::local().canonical(), None);
    }

    #[test]
    fn new_text_message_is_pending() {
        let message = Message::text(ConversationId(1), UserId(2), "hola");
        assert!(message.is_pending());
        assert_eq!(message.content.as_deref(), Some("hola"));
        assert_eq!(message.kind, MessageKind::Text);
    }

    #[test]
    fn preview_falls_back_to_kind_label() {
        let message = Message::attachment(
            ConversationId(1),
            UserId(2),
            MessageKind::Image {
                url: "https://cdn.example.com/a.jpg".to_string(),
            },
            None,
        );
        assert_eq!(message.preview_source(), "image");
    }
}

//! Conversation model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::models::UserId;

/// A unique identifier for a conversation, assigned by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl ConversationId {
    /// Raw numeric value of this ID
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Directory entry for a negotiation thread between exactly two parties.
///
/// The interested party who opened the thread is the buyer; the listing owner
/// is the seller. Authoritative state lives in the remote data service; this
/// is the in-memory summary used for listings and role resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier
    pub id: ConversationId,
    /// The party who opened the thread (the interested party)
    pub buyer_id: UserId,
    /// The listing owner
    pub seller_id: UserId,
    /// Cached preview of the newest message
    pub last_message: Option<String>,
    /// Cached timestamp of the newest message
    pub last_message_at: Option<DateTime<Utc>>,
    /// Messages the current user has not read yet
    pub unread_count: u32,
}

impl Conversation {
    /// The two participants of this thread
    #[must_use]
    pub const fn participants(&self) -> [UserId; 2] {
        [self.buyer_id, self.seller_id]
    }

    /// Whether `user` takes part in this conversation
    #[must_use]
    pub fn has_participant(&self, user: UserId) -> bool {
        self.buyer_id == user || self.seller_id == user
    }

    /// The other party, from `user`'s point of view
    #[must_use]
    pub fn counterpart(&self, user: UserId) -> Option<UserId> {
        if user == self.buyer_id {
            Some(self.seller_id)
        } else if user == self.seller_id {
            Some(self.buyer_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        Conversation {
            id: ConversationId(9),
            buyer_id: UserId(1),
            seller_id: UserId(2),
            last_message: None,
            last_message_at: None,
            unread_count: 0,
        }
    }

    #[test]
    fn counterpart_swaps_sides() {
        let thread = conversation();
        assert_eq!(thread.counterpart(UserId(1)), Some(UserId(2)));
        assert_eq!(thread.counterpart(UserId(2)), Some(UserId(1)));
        assert_eq!(thread.counterpart(UserId(3)), None);
    }

    #[test]
    fn participant_membership() {
        let thread = conversation();
        assert!(thread.has_participant(UserId(1)));
        assert!(!thread.has_participant(UserId(3)));
    }
}

//! Conversation endpoints of the remote data service.

use crate::error::Result;
use crate::models::{Conversation, ConversationId};

use super::dto::RawConversation;
use super::ApiClient;

impl ApiClient {
    /// List the current user's negotiation threads, newest activity first.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let raw: Vec<RawConversation> = self
            .get_json("/v1/conversations", self.fetch_timeout())
            .await?;
        raw.into_iter().map(Conversation::try_from).collect()
    }

    /// Fetch a single conversation's directory entry.
    pub async fn fetch_conversation(&self, conversation: ConversationId) -> Result<Conversation> {
        let raw: RawConversation = self
            .get_json(
                &format!("/v1/conversations/{conversation}"),
                self.fetch_timeout(),
            )
            .await?;
        Conversation::try_from(raw)
    }
}

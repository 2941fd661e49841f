//! Message endpoints of the remote data service.

use crate::error::Result;
use crate::models::{ConversationId, Message};

use super::dto::{OutgoingMessage, RawMessage};
use super::ApiClient;

impl ApiClient {
    /// Fetch messages for a conversation, optionally only those with a
    /// canonical id greater than `after` (the poll fetcher's catch-up query).
    pub async fn fetch_messages(
        &self,
        conversation: ConversationId,
        after: Option<i64>,
    ) -> Result<Vec<Message>> {
        let path = match after {
            Some(id) => format!("/v1/conversations/{conversation}/messages?after={id}"),
            None => format!("/v1/conversations/{conversation}/messages"),
        };
        let raw: Vec<RawMessage> = self.get_json(&path, self.fetch_timeout()).await?;
        raw.into_iter()
            .map(|message| message.into_message(conversation))
            .collect()
    }

    /// Write one message and return its canonical, remotely-assigned form.
    pub async fn send_message(
        &self,
        conversation: ConversationId,
        outgoing: &OutgoingMessage,
    ) -> Result<Message> {
        let path = format!("/v1/conversations/{conversation}/messages");
        let raw: RawMessage = self.post_json(&path, outgoing, self.send_timeout()).await?;
        raw.into_message(conversation)
    }

    /// Mark the whole conversation read for the current user.
    pub async fn mark_conversation_read(&self, conversation: ConversationId) -> Result<()> {
        let path = format!("/v1/conversations/{conversation}/read");
        self.post_empty(&path, &serde_json::json!({}), self.fetch_timeout())
            .await
    }
}

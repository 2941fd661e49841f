//! WebSocket implementation of the realtime transport.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::api::dto::RawMessage;
use crate::error::{Error, Result};
use crate::models::{ConversationId, Message};

use super::{RealtimeSubscription, RealtimeTransport};

const EVENT_BUFFER: usize = 64;

/// Push transport speaking the data service's WebSocket feed protocol.
///
/// One connection per subscription: the server is asked for a single
/// conversation's insert events, so tearing down a subscription closes the
/// socket and nothing leaks across conversations.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// Transport connecting to the given `ws://`/`wss://` endpoint
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let trimmed = url.trim();
        if !trimmed.starts_with("ws://") && !trimmed.starts_with("wss://") {
            return Err(Error::Validation(
                "realtime endpoint must include ws:// or wss://".to_string(),
            ));
        }
        Ok(Self {
            url: trimmed.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeFrame {
    #[serde(rename = "type")]
    kind: &'static str,
    conversation_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ServerFrame {
    #[serde(rename_all = "camelCase")]
    Message {
        #[serde(default)]
        conversation_id: Option<i64>,
        payload: RawMessage,
    },
    Error {
        message: String,
    },
}

#[async_trait]
impl RealtimeTransport for WsTransport {
    async fn subscribe(&self, conversation: ConversationId) -> Result<RealtimeSubscription> {
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|error| Error::NetworkFailure(format!("realtime connect failed: {error}")))?;
        let (mut sink, mut stream) = socket.split();

        let frame = serde_json::to_string(&SubscribeFrame {
            kind: "subscribe",
            conversation_id: conversation.value(),
        })?;
        sink.send(WsMessage::Text(frame.into()))
            .await
            .map_err(|error| Error::NetworkFailure(format!("realtime subscribe failed: {error}")))?;

        let (events, receiver) = mpsc::channel::<Message>(EVENT_BUFFER);
        let worker = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        if let Some(message) = parse_event(text.as_str(), conversation) {
                            if events.send(message).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(WsMessage::Ping(data)) => {
                        if sink.send(WsMessage::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        info!(%conversation, "realtime feed closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(error) => {
                        warn!(%conversation, %error, "realtime feed error");
                        break;
                    }
                }
            }
        });

        Ok(RealtimeSubscription::new(
            conversation,
            receiver,
            Some(worker),
        ))
    }
}

/// Parse one text frame into a message for `conversation`.
///
/// Malformed frames and events for other conversations are logged and
/// dropped; the poll fetcher covers any gap they leave.
fn parse_event(text: &str, conversation: ConversationId) -> Option<Message> {
    let frame = match serde_json::from_str::<ServerFrame>(text) {
        Ok(frame) => frame,
        Err(error) => {
            debug!(%conversation, %error, "ignoring unparseable realtime frame");
            return None;
        }
    };
    match frame {
        ServerFrame::Message {
            conversation_id,
            payload,
        } => {
            if conversation_id.is_some_and(|id| id != conversation.value()) {
                debug!(%conversation, "dropping event for another conversation");
                return None;
            }
            match payload.into_message(conversation) {
                Ok(message) => Some(message),
                Err(error) => {
                    debug!(%conversation, %error, "ignoring malformed realtime payload");
                    None
                }
            }
        }
        ServerFrame::Error { message } => {
            warn!(%conversation, message, "realtime feed reported an error");
            None
        }
    }
}

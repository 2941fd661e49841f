//! Wire payloads of the remote data service.
//!
//! Field names match the service's existing schema and must stay stable. The
//! payloads are loosely shaped (ids arrive as numbers or strings, timestamps
//! in several formats), so everything here is parsed leniently and coerced
//! into the typed domain models before any other module sees it.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{
    Conversation, ConversationId, Exchange, ExchangeId, ExchangeStatus, MeetingDetails, Message,
    MessageId, MessageKind, Proposal, ProposalId, ProposalKind, ProposalStatus, UserId, UserRef,
    Validation,
};
use crate::util::normalize_text_option;

/// Numeric id that the service may serialize as a number or a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LenientId {
    Num(i64),
    Text(String),
}

impl LenientId {
    fn coerce(&self, field: &str) -> Result<i64> {
        match self {
            Self::Num(value) => Ok(*value),
            Self::Text(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Api(format!("field '{field}' is not a numeric id: {raw:?}"))),
        }
    }
}

/// Timestamp that the service may serialize as RFC 3339, a naive datetime, or
/// a Unix epoch in seconds or milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LenientTimestamp {
    Num(i64),
    Text(String),
}

impl LenientTimestamp {
    fn coerce(&self, field: &str) -> Result<DateTime<Utc>> {
        match self {
            Self::Num(value) => {
                // Millisecond epochs are 13 digits for contemporary dates.
                let stamp = if value.abs() >= 1_000_000_000_000 {
                    Utc.timestamp_millis_opt(*value).single()
                } else {
                    Utc.timestamp_opt(*value, 0).single()
                };
                stamp.ok_or_else(|| {
                    Error::Api(format!("field '{field}' holds an out-of-range epoch: {value}"))
                })
            }
            Self::Text(raw) => {
                let raw = raw.trim();
                if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
                    return Ok(stamp.with_timezone(&Utc));
                }
                for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                    if let Ok(stamp) = chrono::NaiveDateTime::parse_from_str(raw, format) {
                        return Ok(stamp.and_utc());
                    }
                }
                Err(Error::Api(format!(
                    "field '{field}' is not a recognized timestamp: {raw:?}"
                )))
            }
        }
    }
}

/// A message as the remote service sends it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub id: LenientId,
    pub sender_id: LenientId,
    #[serde(default)]
    pub content: Option<String>,
    pub sent_at: LenientTimestamp,
    pub kind: String,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_read: Option<bool>,
}

impl RawMessage {
    /// Coerce into the domain model for `conversation`.
    pub fn into_message(self, conversation: ConversationId) -> Result<Message> {
        let kind = match self.kind.as_str() {
            "text" => MessageKind::Text,
            "image" => MessageKind::Image {
                url: require_url(self.attachment_url.clone(), "attachmentUrl")?,
            },
            "location" => MessageKind::Location {
                latitude: self
                    .latitude
                    .ok_or_else(|| Error::Api("location message without latitude".to_string()))?,
                longitude: self
                    .longitude
                    .ok_or_else(|| Error::Api("location message without longitude".to_string()))?,
            },
            "file" => {
                let url = require_url(self.attachment_url.clone(), "attachmentUrl")?;
                let name = normalize_text_option(self.file_name.clone())
                    .or_else(|| {
                        url.rsplit('/')
                            .next()
                            .filter(|segment| !segment.is_empty())
                            .map(ToString::to_string)
                    })
                    .ok_or_else(|| Error::Api("file message without a name".to_string()))?;
                MessageKind::File {
                    url,
                    name,
                    size: self.file_size,
                }
            }
            other => {
                return Err(Error::Api(format!("unknown message kind {other:?}")));
            }
        };

        Ok(Message {
            id: MessageId::Remote(self.id.coerce("id")?),
            conversation_id: conversation,
            sender_id: UserId(self.sender_id.coerce("senderId")?),
            content: normalize_text_option(self.content),
            kind,
            sent_at: self.sent_at.coerce("sentAt")?,
            is_read: self.is_read.unwrap_or(false),
        })
    }
}

/// A conversation directory entry as the remote service sends it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConversation {
    pub id: LenientId,
    pub buyer_id: LenientId,
    pub seller_id: LenientId,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<LenientTimestamp>,
    #[serde(default)]
    pub unread_count: Option<u32>,
}

impl TryFrom<RawConversation> for Conversation {
    type Error = Error;

    fn try_from(raw: RawConversation) -> Result<Self> {
        let last_message_at = raw
            .last_message_time
            .as_ref()
            .map(|stamp| stamp.coerce("lastMessageTime"))
            .transpose()?;
        Ok(Self {
            id: ConversationId(raw.id.coerce("id")?),
            buyer_id: UserId(raw.buyer_id.coerce("buyerId")?),
            seller_id: UserId(raw.seller_id.coerce("sellerId")?),
            last_message: normalize_text_option(raw.last_message),
            last_message_at,
            unread_count: raw.unread_count.unwrap_or(0),
        })
    }
}

/// Participant profile as embedded in proposal payloads
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserRef {
    pub id: LenientId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl RawUserRef {
    fn coerce(self, field: &str) -> Result<UserRef> {
        Ok(UserRef {
            id: UserId(self.id.coerce(field)?),
            name: normalize_text_option(self.name).unwrap_or_default(),
            avatar_url: normalize_text_option(self.avatar_url),
        })
    }
}

/// A proposal as the remote service sends it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProposal {
    pub id: LenientId,
    pub conversation_id: LenientId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub proposed_price: Option<f64>,
    #[serde(default)]
    pub conditions: Option<String>,
    #[serde(default)]
    pub meeting_date: Option<String>,
    #[serde(default)]
    pub meeting_place: Option<String>,
    pub status: String,
    pub created_at: LenientTimestamp,
    #[serde(default)]
    pub responded_at: Option<LenientTimestamp>,
    #[serde(default)]
    pub response: Option<String>,
    pub proposer_id: LenientId,
    pub receiver_id: LenientId,
    #[serde(default)]
    pub proposer: Option<RawUserRef>,
    #[serde(default)]
    pub receiver: Option<RawUserRef>,
}

impl TryFrom<RawProposal> for Proposal {
    type Error = Error;

    fn try_from(raw: RawProposal) -> Result<Self> {
        let status = ProposalStatus::from_label(raw.status.trim())
            .ok_or_else(|| Error::Api(format!("unknown proposal status {:?}", raw.status)))?;

        let meeting = match (
            normalize_text_option(raw.meeting_date),
            normalize_text_option(raw.meeting_place),
        ) {
            (Some(date_raw), Some(place)) => {
                let (date, time) = MeetingDetails::parse_wire_date(&date_raw).ok_or_else(|| {
                    Error::Api(format!("unparseable meetingDate {date_raw:?}"))
                })?;
                Some(MeetingDetails {
                    date,
                    time,
                    place,
                    notes: None,
                })
            }
            _ => None,
        };

        let proposer_id = raw.proposer_id.coerce("proposerId")?;
        let receiver_id = raw.receiver_id.coerce("receiverId")?;
        let proposer = match raw.proposer {
            Some(profile) => profile.coerce("proposer.id")?,
            None => UserRef::bare(UserId(proposer_id)),
        };
        let receiver = match raw.receiver {
            Some(profile) => profile.coerce("receiver.id")?,
            None => UserRef::bare(UserId(receiver_id)),
        };

        Ok(Self {
            id: ProposalId(raw.id.coerce("id")?),
            conversation_id: ConversationId(raw.conversation_id.coerce("conversationId")?),
            kind: ProposalKind::from_label(raw.kind.trim()),
            description: normalize_text_option(raw.description).unwrap_or_default(),
            proposed_price: raw.proposed_price,
            conditions: normalize_text_option(raw.conditions),
            meeting,
            status,
            created_at: raw.created_at.coerce("createdAt")?,
            responded_at: raw
                .responded_at
                .as_ref()
                .map(|stamp| stamp.coerce("respondedAt"))
                .transpose()?,
            response: normalize_text_option(raw.response),
            proposer,
            receiver,
        })
    }
}

/// A single validation entry as the remote service sends it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawValidation {
    pub user_id: LenientId,
    pub is_successful: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub validated_at: Option<LenientTimestamp>,
}

impl TryFrom<RawValidation> for Validation {
    type Error = Error;

    fn try_from(raw: RawValidation) -> Result<Self> {
        Ok(Self {
            user_id: UserId(raw.user_id.coerce("userId")?),
            is_successful: raw.is_successful,
            comment: normalize_text_option(raw.comment),
            rating: raw.rating,
            validated_at: raw
                .validated_at
                .as_ref()
                .map_or_else(|| Ok(Utc::now()), |stamp| stamp.coerce("validatedAt"))?,
        })
    }
}

/// An exchange record as the remote service sends it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExchange {
    pub id: LenientId,
    pub proposal_id: LenientId,
    pub conversation_id: LenientId,
    pub status: String,
    #[serde(default)]
    pub validations: Vec<RawValidation>,
}

impl TryFrom<RawExchange> for Exchange {
    type Error = Error;

    fn try_from(raw: RawExchange) -> Result<Self> {
        let status = ExchangeStatus::from_label(raw.status.trim())
            .ok_or_else(|| Error::Api(format!("unknown exchange status {:?}", raw.status)))?;
        Ok(Self {
            id: ExchangeId(raw.id.coerce("id")?),
            proposal_id: ProposalId(raw.proposal_id.coerce("proposalId")?),
            conversation_id: ConversationId(raw.conversation_id.coerce("conversationId")?),
            status,
            validations: raw
                .validations
                .into_iter()
                .map(Validation::try_from)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// Body of a message write, built from a pending local message
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl OutgoingMessage {
    /// Wire body for a pending local message
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        let mut body = Self {
            content: message.content.clone(),
            kind: message.kind.label(),
            attachment_url: None,
            file_name: None,
            file_size: None,
            latitude: None,
            longitude: None,
        };
        match &message.kind {
            MessageKind::Text => {}
            MessageKind::Image { url } => body.attachment_url = Some(url.clone()),
            MessageKind::Location {
                latitude,
                longitude,
            } => {
                body.latitude = Some(*latitude);
                body.longitude = Some(*longitude);
            }
            MessageKind::File { url, name, size } => {
                body.attachment_url = Some(url.clone());
                body.file_name = Some(name.clone());
                body.file_size = *size;
            }
        }
        body
    }
}

fn require_url(value: Option<String>, field: &str) -> Result<String> {
    normalize_text_option(value)
        .ok_or_else(|| Error::Api(format!("attachment message without {field}")))
}

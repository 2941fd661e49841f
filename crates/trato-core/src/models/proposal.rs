//! Proposal model: structured offers attached to a conversation

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::models::{ConversationId, UserRef};

/// A unique identifier for a proposal, assigned by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub i64);

impl ProposalId {
    /// Raw numeric value of this ID
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProposalId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// What kind of terms a proposal puts on the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalKind {
    /// A price offer for the listed item
    Price,
    /// A barter: item for item
    Exchange,
    /// A meeting arrangement without new terms
    Meeting,
    /// Free-form terms (delivery, warranty, extras)
    Terms,
    /// Anything else
    Other,
}

impl ProposalKind {
    /// Wire label matching the remote service's schema
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Exchange => "exchange",
            Self::Meeting => "meeting",
            Self::Terms => "terms",
            Self::Other => "other",
        }
    }

    /// Parse a wire label; unknown labels map to `Other`
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "price" => Self::Price,
            "exchange" => Self::Exchange,
            "meeting" => Self::Meeting,
            "terms" => Self::Terms,
            _ => Self::Other,
        }
    }
}

/// Lifecycle state of a proposal.
///
/// `pending` transitions to exactly one of the other states and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Awaiting the receiver's response
    Pending,
    /// Accepted; an exchange record now tracks completion
    Accepted,
    /// Declined by the receiver
    Rejected,
    /// Superseded by a counter-offer
    Countered,
    /// Withdrawn by its proposer
    Cancelled,
}

impl ProposalStatus {
    /// Wire label matching the remote service's schema
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Countered => "countered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a wire label
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "countered" => Some(Self::Countered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether no further transition is possible from this state
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Agreed meeting slot attached to an accepted proposal.
///
/// Place and date are mandatory before a proposal can be accepted; the time
/// and notes are optional refinements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingDetails {
    /// Meeting day
    pub date: NaiveDate,
    /// Meeting time, when one was agreed
    pub time: Option<NaiveTime>,
    /// Meeting place
    pub place: String,
    /// Free-form notes; only surfaced in the acceptance message
    pub notes: Option<String>,
}

impl MeetingDetails {
    /// Serialize date and time into the remote `meetingDate` field:
    /// `YYYY-MM-DD`, or `YYYY-MM-DDTHH:MM` when a time is present.
    #[must_use]
    pub fn wire_date(&self) -> String {
        match self.time {
            Some(time) => format!("{}T{}", self.date, time.format("%H:%M")),
            None => self.date.to_string(),
        }
    }

    /// Parse the remote `meetingDate` field, accepting both shapes
    /// produced by `wire_date` as well as full RFC 3339 timestamps.
    pub fn parse_wire_date(raw: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some((date, None));
        }
        for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.fZ"] {
            if let Ok(stamp) = chrono::NaiveDateTime::parse_from_str(raw, format) {
                return Some((stamp.date(), Some(stamp.time())));
            }
        }
        None
    }
}

/// A structured offer embedded in a conversation, subject to accept/reject
/// by the non-initiating party
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique identifier
    pub id: ProposalId,
    /// Conversation this proposal belongs to
    pub conversation_id: ConversationId,
    /// What kind of terms are offered
    pub kind: ProposalKind,
    /// Human-readable description of the offer
    pub description: String,
    /// Offered price, for price proposals
    pub proposed_price: Option<f64>,
    /// Extra conditions attached to the offer
    pub conditions: Option<String>,
    /// Agreed meeting, once known
    pub meeting: Option<MeetingDetails>,
    /// Lifecycle state
    pub status: ProposalStatus,
    /// When the proposal was created
    pub created_at: DateTime<Utc>,
    /// When the receiver responded, if they have
    pub responded_at: Option<DateTime<Utc>>,
    /// Receiver's response note (e.g. a rejection reason)
    pub response: Option<String>,
    /// The party who made the offer
    pub proposer: UserRef,
    /// The party the offer is addressed to
    pub receiver: UserRef,
}

impl Proposal {
    /// Whether this proposal is still awaiting a response
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, ProposalStatus::Pending)
    }

    /// Whether meeting date and place are already set
    #[must_use]
    pub const fn has_meeting_details(&self) -> bool {
        self.meeting.is_some()
    }
}

/// The fields a user fills in when opening (or countering with) a proposal
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalDraft {
    /// What kind of terms are offered
    pub kind: ProposalKind,
    /// Human-readable description of the offer
    pub description: String,
    /// Offered price, for price proposals
    pub proposed_price: Option<f64>,
    /// Extra conditions attached to the offer
    pub conditions: Option<String>,
    /// Suggested meeting, when already known
    pub meeting: Option<MeetingDetails>,
}

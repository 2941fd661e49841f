//! Exchange model: the transaction record spawned by an accepted proposal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::models::{ConversationId, ProposalId, UserId};

/// A unique identifier for an exchange, assigned by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(pub i64);

impl ExchangeId {
    /// Raw numeric value of this ID
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExchangeId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Resolution state of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeStatus {
    /// Fewer than two validations submitted
    PendingValidation,
    /// Both parties validated successfully
    Completed,
    /// Both parties validated and at least one reported failure;
    /// the underlying listing reverts to available
    Failed,
}

impl ExchangeStatus {
    /// Wire label matching the remote service's schema
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingValidation => "pending_validation",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a wire label
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "pending_validation" => Some(Self::PendingValidation),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One participant's assertion that the agreed exchange did or did not happen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    /// The participant who validated
    pub user_id: UserId,
    /// Whether the exchange went through from their side
    pub is_successful: bool,
    /// Free-form comment
    pub comment: Option<String>,
    /// 1-5 rating of the counterpart
    pub rating: Option<u8>,
    /// When the validation was recorded
    pub validated_at: DateTime<Utc>,
}

/// The transaction record created once a proposal is accepted.
///
/// Resolved by two-sided validation: both parties must report back before the
/// exchange leaves `pending_validation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// Unique identifier
    pub id: ExchangeId,
    /// The accepted proposal this exchange tracks
    pub proposal_id: ProposalId,
    /// Conversation the proposal belongs to
    pub conversation_id: ConversationId,
    /// Resolution state
    pub status: ExchangeStatus,
    /// Per-participant validations submitted so far (at most two)
    pub validations: Vec<Validation>,
}

/// What a participant submits when validating an exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationInput {
    /// Whether the exchange went through from their side
    pub is_successful: bool,
    /// Free-form comment
    pub comment: Option<String>,
    /// 1-5 rating of the counterpart
    pub rating: Option<u8>,
    /// Optional per-aspect scores, passed through to the remote service
    pub aspects: Option<serde_json::Value>,
}

impl Exchange {
    /// The validation `user` already submitted, if any
    #[must_use]
    pub fn validation_for(&self, user: UserId) -> Option<&Validation> {
        self.validations.iter().find(|entry| entry.user_id == user)
    }

    /// Completion rule: `completed` iff both participants validated and both
    /// reported success; `failed` once both validated and either reported
    /// failure; `pending_validation` while fewer than two validations exist.
    #[must_use]
    pub fn resolved_status(&self) -> ExchangeStatus {
        if self.validations.len() < 2 {
            return ExchangeStatus::PendingValidation;
        }
        if self.validations.iter().all(|entry| entry.is_successful) {
            ExchangeStatus::Completed
        } else {
            ExchangeStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn validation(user: i64, is_successful: bool) -> Validation {
        Validation {
            user_id: UserId(user),
            is_successful,
            comment: None,
            rating: None,
            validated_at: Utc::now(),
        }
    }

    fn exchange(validations: Vec<Validation>) -> Exchange {
        Exchange {
            id: ExchangeId(1),
            proposal_id: ProposalId(1),
            conversation_id: ConversationId(1),
            status: ExchangeStatus::PendingValidation,
            validations,
        }
    }

    #[test]
    fn one_validation_stays_pending() {
        let record = exchange(vec![validation(1, true)]);
        assert_eq!(record.resolved_status(), ExchangeStatus::PendingValidation);
    }

    #[test]
    fn two_successful_validations_complete() {
        let record = exchange(vec![validation(1, true), validation(2, true)]);
        assert_eq!(record.resolved_status(), ExchangeStatus::Completed);
    }

    #[test]
    fn one_failed_validation_fails_the_exchange() {
        let record = exchange(vec![validation(1, true), validation(2, false)]);
        assert_eq!(record.resolved_status(), ExchangeStatus::Failed);

        let record = exchange(vec![validation(1, false), validation(2, false)]);
        assert_eq!(record.resolved_status(), ExchangeStatus::Failed);
    }

    #[test]
    fn validation_lookup_by_user() {
        let record = exchange(vec![validation(1, true)]);
        assert!(record.validation_for(UserId(1)).is_some());
        assert!(record.validation_for(UserId(2)).is_none());
    }

    #[test]
    fn status_labels_roundtrip() {
        for status in [
            ExchangeStatus::PendingValidation,
            ExchangeStatus::Completed,
            ExchangeStatus::Failed,
        ] {
            assert_eq!(ExchangeStatus::from_label(status.label()), Some(status));
        }
    }
}

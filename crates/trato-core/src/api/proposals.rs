//! Proposal and exchange endpoints of the remote data service.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{
    ConversationId, Exchange, ExchangeId, MeetingDetails, Proposal, ProposalDraft, ProposalId,
    UserId, ValidationInput,
};

use super::dto::{RawExchange, RawProposal};
use super::ApiClient;

/// Result of a proposal mutation: the new proposal state, plus the exchange
/// record when an acceptance spawned one
#[derive(Debug, Clone)]
pub struct ProposalUpdate {
    pub proposal: Proposal,
    pub exchange: Option<Exchange>,
}

/// Result of a counter-offer: the superseded proposal and its replacement
#[derive(Debug, Clone)]
pub struct CounterUpdate {
    pub superseded: Proposal,
    pub proposal: Proposal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProposalBody<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    proposed_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conditions: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meeting_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meeting_place: Option<&'a str>,
}

impl<'a> ProposalBody<'a> {
    fn from_draft(draft: &'a ProposalDraft) -> Self {
        Self {
            kind: draft.kind.label(),
            description: &draft.description,
            proposed_price: draft.proposed_price,
            conditions: draft.conditions.as_deref(),
            meeting_date: draft.meeting.as_ref().map(MeetingDetails::wire_date),
            meeting_place: draft.meeting.as_ref().map(|meeting| meeting.place.as_str()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RespondBody<'a> {
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meeting_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meeting_place: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RespondResponse {
    proposal: RawProposal,
    #[serde(default)]
    exchange: Option<RawExchange>,
}

#[derive(Debug, Deserialize)]
struct CounterResponse {
    superseded: RawProposal,
    proposal: RawProposal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateBody<'a> {
    user_id: i64,
    is_successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspects: Option<&'a serde_json::Value>,
}

impl ApiClient {
    /// All proposals attached to a conversation, oldest first.
    pub async fn list_proposals(&self, conversation: ConversationId) -> Result<Vec<Proposal>> {
        let raw: Vec<RawProposal> = self
            .get_json(
                &format!("/v1/conversations/{conversation}/proposals"),
                self.fetch_timeout(),
            )
            .await?;
        raw.into_iter().map(Proposal::try_from).collect()
    }

    /// Open a new proposal on a conversation.
    pub async fn create_proposal(
        &self,
        conversation: ConversationId,
        draft: &ProposalDraft,
    ) -> Result<Proposal> {
        let raw: RawProposal = self
            .post_json(
                &format!("/v1/conversations/{conversation}/proposals"),
                &ProposalBody::from_draft(draft),
                self.send_timeout(),
            )
            .await?;
        Proposal::try_from(raw)
    }

    /// Accept a pending proposal, supplying the agreed meeting slot.
    pub async fn accept_proposal(
        &self,
        proposal: ProposalId,
        meeting: &MeetingDetails,
    ) -> Result<ProposalUpdate> {
        let body = RespondBody {
            action: "accept",
            reason: None,
            meeting_date: Some(meeting.wire_date()),
            meeting_place: Some(&meeting.place),
        };
        let response: RespondResponse = self
            .post_json(
                &format!("/v1/proposals/{proposal}/respond"),
                &body,
                self.send_timeout(),
            )
            .await?;
        Ok(ProposalUpdate {
            proposal: Proposal::try_from(response.proposal)?,
            exchange: response.exchange.map(Exchange::try_from).transpose()?,
        })
    }

    /// Reject a pending proposal with an optional reason.
    pub async fn reject_proposal(
        &self,
        proposal: ProposalId,
        reason: Option<&str>,
    ) -> Result<ProposalUpdate> {
        let body = RespondBody {
            action: "reject",
            reason,
            meeting_date: None,
            meeting_place: None,
        };
        let response: RespondResponse = self
            .post_json(
                &format!("/v1/proposals/{proposal}/respond"),
                &body,
                self.send_timeout(),
            )
            .await?;
        Ok(ProposalUpdate {
            proposal: Proposal::try_from(response.proposal)?,
            exchange: response.exchange.map(Exchange::try_from).transpose()?,
        })
    }

    /// Replace a pending proposal with a counter-offer.
    pub async fn counter_proposal(
        &self,
        proposal: ProposalId,
        draft: &ProposalDraft,
    ) -> Result<CounterUpdate> {
        let response: CounterResponse = self
            .post_json(
                &format!("/v1/proposals/{proposal}/counter"),
                &ProposalBody::from_draft(draft),
                self.send_timeout(),
            )
            .await?;
        Ok(CounterUpdate {
            superseded: Proposal::try_from(response.superseded)?,
            proposal: Proposal::try_from(response.proposal)?,
        })
    }

    /// Withdraw a pending proposal.
    pub async fn cancel_proposal(&self, proposal: ProposalId) -> Result<Proposal> {
        let raw: RawProposal = self
            .post_json(
                &format!("/v1/proposals/{proposal}/cancel"),
                &serde_json::json!({}),
                self.send_timeout(),
            )
            .await?;
        Proposal::try_from(raw)
    }

    /// Fetch an exchange record with its validations.
    pub async fn fetch_exchange(&self, exchange: ExchangeId) -> Result<Exchange> {
        let raw: RawExchange = self
            .get_json(&format!("/v1/exchanges/{exchange}"), self.fetch_timeout())
            .await?;
        Exchange::try_from(raw)
    }

    /// Record one participant's validation and return the updated exchange.
    pub async fn validate_exchange(
        &self,
        exchange: ExchangeId,
        user: UserId,
        input: &ValidationInput,
    ) -> Result<Exchange> {
        let body = ValidateBody {
            user_id: user.value(),
            is_successful: input.is_successful,
            comment: input.comment.as_deref(),
            rating: input.rating,
            aspects: input.aspects.as_ref(),
        };
        let raw: RawExchange = self
            .post_json(
                &format!("/v1/exchanges/{exchange}/validations"),
                &body,
                self.send_timeout(),
            )
            .await?;
        Exchange::try_from(raw)
    }
}

//! Transition rules for the proposal state machine.
//!
//! Pure functions, no IO. Role and status gating live here and nowhere else;
//! the engine and every frontend query these rules instead of re-deriving
//! them from participant ids or status strings.

use crate::error::{Error, Result};
use crate::models::{
    MeetingDetails, Proposal, ProposalDraft, ProposalId, ProposalKind, ProposalStatus, UserId,
};
use crate::roles::{resolve_role, ExchangeParticipants, Role};

/// Participants of a proposal, as the role resolver expects them
#[must_use]
pub fn participants_of(proposal: &Proposal) -> ExchangeParticipants {
    ExchangeParticipants {
        proposer_id: proposal.proposer.id,
        receiver_id: proposal.receiver.id,
    }
}

/// Only the buyer side may open a proposal.
pub fn ensure_can_create(actor: UserId, participants: ExchangeParticipants) -> Result<()> {
    match resolve_role(actor, participants) {
        Some(Role::Buyer) => Ok(()),
        Some(Role::Seller) => Err(Error::Forbidden(
            "only the interested party may open a proposal".to_string(),
        )),
        None => Err(Error::Forbidden(
            "user is not a participant in this negotiation".to_string(),
        )),
    }
}

/// Reject obviously malformed drafts before any network request is issued.
pub fn validate_draft(draft: &ProposalDraft) -> Result<()> {
    if draft.description.trim().is_empty() {
        return Err(Error::Validation(
            "proposal description must not be empty".to_string(),
        ));
    }
    if draft.kind == ProposalKind::Price {
        match draft.proposed_price {
            Some(price) if price > 0.0 => {}
            _ => {
                return Err(Error::Validation(
                    "price proposals require a positive proposedPrice".to_string(),
                ));
            }
        }
    }
    if let Some(meeting) = &draft.meeting {
        ensure_meeting_fields(meeting)?;
    }
    Ok(())
}

/// Responses (accept, reject, counter) come from the receiver, never the
/// proposer, and only while the proposal is pending.
pub fn ensure_can_respond(proposal: &Proposal, actor: UserId) -> Result<()> {
    match resolve_role(actor, participants_of(proposal)) {
        None => Err(Error::Forbidden(
            "user is not a participant in this negotiation".to_string(),
        )),
        Some(Role::Buyer) => Err(Error::Forbidden(
            "you cannot respond to your own proposal".to_string(),
        )),
        Some(Role::Seller) => ensure_pending(proposal),
    }
}

/// Withdrawal is the proposer's move, and only while the proposal is pending.
pub fn ensure_can_cancel(proposal: &Proposal, actor: UserId) -> Result<()> {
    match resolve_role(actor, participants_of(proposal)) {
        None => Err(Error::Forbidden(
            "user is not a participant in this negotiation".to_string(),
        )),
        Some(Role::Seller) => Err(Error::Forbidden(
            "only the proposer may withdraw a proposal".to_string(),
        )),
        Some(Role::Buyer) => ensure_pending(proposal),
    }
}

/// At most one proposal per conversation may be accepted at a time.
pub fn ensure_no_active_accept(proposals: &[Proposal], target: ProposalId) -> Result<()> {
    if let Some(active) = proposals
        .iter()
        .find(|proposal| proposal.status == ProposalStatus::Accepted && proposal.id != target)
    {
        return Err(Error::Conflict(format!(
            "proposal {} is already accepted in this conversation",
            active.id
        )));
    }
    Ok(())
}

/// Meeting details required to complete an acceptance: the ones supplied by
/// the caller, or the ones the proposal already carries.
pub fn resolve_meeting(
    proposal: &Proposal,
    supplied: Option<MeetingDetails>,
) -> Result<MeetingDetails> {
    let meeting = supplied.or_else(|| proposal.meeting.clone()).ok_or_else(|| {
        Error::Validation(
            "meeting date and place are required to accept a proposal".to_string(),
        )
    })?;
    ensure_meeting_fields(&meeting)?;
    Ok(meeting)
}

/// Summary line appended to the conversation when a proposal is accepted.
#[must_use]
pub fn acceptance_summary(proposal: &Proposal, meeting: &MeetingDetails) -> String {
    let mut summary = format!("Propuesta aceptada: {}.", proposal.description.trim());
    match meeting.time {
        Some(time) => {
            summary.push_str(&format!(
                " Encuentro el {} a las {} en {}.",
                meeting.date,
                time.format("%H:%M"),
                meeting.place
            ));
        }
        None => {
            summary.push_str(&format!(
                " Encuentro el {} en {}.",
                meeting.date, meeting.place
            ));
        }
    }
    if let Some(notes) = meeting.notes.as_deref().map(str::trim).filter(|notes| !notes.is_empty()) {
        summary.push_str(&format!(" {notes}"));
    }
    summary
}

fn ensure_pending(proposal: &Proposal) -> Result<()> {
    if proposal.is_pending() {
        Ok(())
    } else {
        Err(Error::Conflict(format!(
            "proposal {} is already {}",
            proposal.id,
            proposal.status.label()
        )))
    }
}

fn ensure_meeting_fields(meeting: &MeetingDetails) -> Result<()> {
    if meeting.place.trim().is_empty() {
        return Err(Error::Validation(
            "meeting place must not be empty".to_string(),
        ));
    }
    Ok(())
}

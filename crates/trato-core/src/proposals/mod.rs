//! The proposal engine: negotiation lifecycle over a conversation.
//!
//! Wraps the pure transition rules in [`state`] with the remote calls that
//! persist them. Every mutating operation re-derives the actor's role and
//! checks the transition locally before any network request, so a frontend
//! can never smuggle a forbidden action past the engine.

pub mod state;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::api::dto::OutgoingMessage;
use crate::api::proposals::{CounterUpdate, ProposalUpdate};
use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::models::{
    Conversation, ConversationId, Exchange, ExchangeId, MeetingDetails, Proposal, ProposalDraft,
    ProposalId, UserId, ValidationInput,
};
use crate::roles::{resolve_role, ExchangeParticipants};
use crate::session::SessionProvider;

/// Remote negotiation operations the engine depends on.
///
/// The actor is passed explicitly even though the production implementation
/// derives it from the bearer token; it keeps the context visible and lets
/// tests run several identities against one backend.
#[async_trait]
pub trait NegotiationBackend: Send + Sync {
    async fn list_proposals(&self, conversation: ConversationId) -> Result<Vec<Proposal>>;

    async fn create_proposal(
        &self,
        conversation: ConversationId,
        actor: UserId,
        draft: &ProposalDraft,
    ) -> Result<Proposal>;

    async fn accept_proposal(
        &self,
        proposal: ProposalId,
        actor: UserId,
        meeting: &MeetingDetails,
    ) -> Result<ProposalUpdate>;

    async fn reject_proposal(
        &self,
        proposal: ProposalId,
        actor: UserId,
        reason: Option<&str>,
    ) -> Result<ProposalUpdate>;

    async fn counter_proposal(
        &self,
        proposal: ProposalId,
        actor: UserId,
        draft: &ProposalDraft,
    ) -> Result<CounterUpdate>;

    async fn cancel_proposal(&self, proposal: ProposalId, actor: UserId) -> Result<Proposal>;

    async fn fetch_exchange(&self, exchange: ExchangeId) -> Result<Exchange>;

    async fn validate_exchange(
        &self,
        exchange: ExchangeId,
        actor: UserId,
        input: &ValidationInput,
    ) -> Result<Exchange>;
}

#[async_trait]
impl NegotiationBackend for ApiClient {
    async fn list_proposals(&self, conversation: ConversationId) -> Result<Vec<Proposal>> {
        Self::list_proposals(self, conversation).await
    }

    async fn create_proposal(
        &self,
        conversation: ConversationId,
        _actor: UserId,
        draft: &ProposalDraft,
    ) -> Result<Proposal> {
        Self::create_proposal(self, conversation, draft).await
    }

    async fn accept_proposal(
        &self,
        proposal: ProposalId,
        _actor: UserId,
        meeting: &MeetingDetails,
    ) -> Result<ProposalUpdate> {
        Self::accept_proposal(self, proposal, meeting).await
    }

    async fn reject_proposal(
        &self,
        proposal: ProposalId,
        _actor: UserId,
        reason: Option<&str>,
    ) -> Result<ProposalUpdate> {
        Self::reject_proposal(self, proposal, reason).await
    }

    async fn counter_proposal(
        &self,
        proposal: ProposalId,
        _actor: UserId,
        draft: &ProposalDraft,
    ) -> Result<CounterUpdate> {
        Self::counter_proposal(self, proposal, draft).await
    }

    async fn cancel_proposal(&self, proposal: ProposalId, _actor: UserId) -> Result<Proposal> {
        Self::cancel_proposal(self, proposal).await
    }

    async fn fetch_exchange(&self, exchange: ExchangeId) -> Result<Exchange> {
        Self::fetch_exchange(self, exchange).await
    }

    async fn validate_exchange(
        &self,
        exchange: ExchangeId,
        actor: UserId,
        input: &ValidationInput,
    ) -> Result<Exchange> {
        Self::validate_exchange(self, exchange, actor, input).await
    }
}

/// Where the engine appends synthetic system messages (acceptance summaries).
///
/// A live [`crate::chat::ChatHandle`] routes them through the optimistic
/// path; `ApiClient` writes them directly when no chat view is open.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn post_text(&self, conversation: ConversationId, text: &str) -> Result<()>;
}

#[async_trait]
impl MessageSink for ApiClient {
    async fn post_text(&self, conversation: ConversationId, text: &str) -> Result<()> {
        let body = OutgoingMessage {
            content: Some(text.to_string()),
            kind: "text",
            attachment_url: None,
            file_name: None,
            file_size: None,
            latitude: None,
            longitude: None,
        };
        self.send_message(conversation, &body).await.map(|_| ())
    }
}

#[async_trait]
impl MessageSink for crate::chat::ChatHandle {
    async fn post_text(&self, conversation: ConversationId, text: &str) -> Result<()> {
        if conversation != self.conversation_id() {
            return Err(Error::Conflict(format!(
                "chat handle is bound to conversation {}, not {conversation}",
                self.conversation_id()
            )));
        }
        self.send_text(text).await
    }
}

/// Result of recording (or re-recording) an exchange validation
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    /// The validation was recorded; the exchange may have resolved
    Recorded(Exchange),
    /// This user had already validated; nothing changed. Surfaced as a
    /// success so repeated taps stay idempotent.
    AlreadyValidated(Exchange),
}

impl ValidationOutcome {
    /// The exchange state after the call
    #[must_use]
    pub const fn exchange(&self) -> &Exchange {
        match self {
            Self::Recorded(exchange) | Self::AlreadyValidated(exchange) => exchange,
        }
    }

    /// Whether this call was a no-op repeat
    #[must_use]
    pub const fn is_repeat(&self) -> bool {
        matches!(self, Self::AlreadyValidated(_))
    }
}

/// Negotiation lifecycle service for the signed-in user
pub struct ProposalEngine {
    backend: Arc<dyn NegotiationBackend>,
    sink: Arc<dyn MessageSink>,
    session: Arc<dyn SessionProvider>,
}

impl ProposalEngine {
    /// Build an engine over the given collaborators
    #[must_use]
    pub fn new(
        backend: Arc<dyn NegotiationBackend>,
        sink: Arc<dyn MessageSink>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            backend,
            sink,
            session,
        }
    }

    /// All proposals on a conversation, as the remote holds them
    pub async fn list(&self, conversation: ConversationId) -> Result<Vec<Proposal>> {
        self.backend.list_proposals(conversation).await
    }

    /// Open a new proposal. Buyer only.
    pub async fn create(
        &self,
        conversation: &Conversation,
        draft: ProposalDraft,
    ) -> Result<Proposal> {
        let actor = self.session.current_user()?;
        state::ensure_can_create(
            actor,
            ExchangeParticipants {
                proposer_id: conversation.buyer_id,
                receiver_id: conversation.seller_id,
            },
        )?;
        state::validate_draft(&draft)?;
        self.backend
            .create_proposal(conversation.id, actor, &draft)
            .await
    }

    /// Accept a pending proposal. Seller only; requires meeting details and
    /// no other accepted proposal in the conversation. On success an exchange
    /// record exists and an acceptance summary is appended to the thread.
    pub async fn accept(
        &self,
        conversation: ConversationId,
        proposal: ProposalId,
        meeting: Option<MeetingDetails>,
    ) -> Result<ProposalUpdate> {
        let actor = self.session.current_user()?;
        let proposals = self.backend.list_proposals(conversation).await?;
        let target = find_proposal(&proposals, proposal)?;
        state::ensure_can_respond(target, actor)?;
        state::ensure_no_active_accept(&proposals, proposal)?;
        let meeting = state::resolve_meeting(target, meeting)?;

        let update = self
            .backend
            .accept_proposal(proposal, actor, &meeting)
            .await?;

        let summary = state::acceptance_summary(&update.proposal, &meeting);
        if let Err(error) = self.sink.post_text(conversation, &summary).await {
            // The acceptance already happened remotely; a lost summary
            // message must not fail it.
            warn!(%conversation, %error, "failed to append acceptance message");
        }
        Ok(update)
    }

    /// Reject a pending proposal with an optional reason. Seller only.
    pub async fn reject(
        &self,
        conversation: ConversationId,
        proposal: ProposalId,
        reason: Option<String>,
    ) -> Result<ProposalUpdate> {
        let actor = self.session.current_user()?;
        let proposals = self.backend.list_proposals(conversation).await?;
        let target = find_proposal(&proposals, proposal)?;
        state::ensure_can_respond(target, actor)?;
        self.backend
            .reject_proposal(proposal, actor, reason.as_deref())
            .await
    }

    /// Replace a pending proposal with a counter-offer. The responder becomes
    /// the proposer of the replacement, so accept/reject flips sides.
    pub async fn counter(
        &self,
        conversation: ConversationId,
        proposal: ProposalId,
        draft: ProposalDraft,
    ) -> Result<CounterUpdate> {
        let actor = self.session.current_user()?;
        let proposals = self.backend.list_proposals(conversation).await?;
        let target = find_proposal(&proposals, proposal)?;
        state::ensure_can_respond(target, actor)?;
        state::validate_draft(&draft)?;
        self.backend
            .counter_proposal(proposal, actor, &draft)
            .await
    }

    /// Withdraw a pending proposal. Proposer only.
    pub async fn cancel(
        &self,
        conversation: ConversationId,
        proposal: ProposalId,
    ) -> Result<Proposal> {
        let actor = self.session.current_user()?;
        let proposals = self.backend.list_proposals(conversation).await?;
        let target = find_proposal(&proposals, proposal)?;
        state::ensure_can_cancel(target, actor)?;
        self.backend.cancel_proposal(proposal, actor).await
    }

    /// Record the signed-in user's validation of an exchange.
    ///
    /// Idempotent per user: a repeat submission is reported as
    /// [`ValidationOutcome::AlreadyValidated`], never an error.
    pub async fn validate(
        &self,
        exchange: ExchangeId,
        input: ValidationInput,
    ) -> Result<ValidationOutcome> {
        if let Some(rating) = input.rating {
            if !(1..=5).contains(&rating) {
                return Err(Error::Validation(
                    "rating must be between 1 and 5".to_string(),
                ));
            }
        }

        let actor = self.session.current_user()?;
        let current = self.backend.fetch_exchange(exchange).await?;

        let proposals = self
            .backend
            .list_proposals(current.conversation_id)
            .await?;
        let proposal = find_proposal(&proposals, current.proposal_id)?;
        if resolve_role(actor, state::participants_of(proposal)).is_none() {
            return Err(Error::Forbidden(
                "user is not a participant in this exchange".to_string(),
            ));
        }

        if current.validation_for(actor).is_some() {
            return Ok(ValidationOutcome::AlreadyValidated(current));
        }

        let updated = self
            .backend
            .validate_exchange(exchange, actor, &input)
            .await?;
        Ok(ValidationOutcome::Recorded(updated))
    }
}

fn find_proposal(proposals: &[Proposal], id: ProposalId) -> Result<&Proposal> {
    proposals
        .iter()
        .find(|proposal| proposal.id == id)
        .ok_or_else(|| Error::NotFound(format!("proposal {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::{NaiveDate, NaiveTime, Utc};
    use pretty_assertions::assert_eq;

    use crate::models::{ExchangeStatus, ProposalKind, ProposalStatus, UserRef, Validation};
    use crate::session::{Session, StaticSessionProvider};

    const CONVERSATION: ConversationId = ConversationId(7);
    const BUYER: UserId = UserId(1);
    const SELLER: UserId = UserId(2);

    fn conversation() -> Conversation {
        Conversation {
            id: CONVERSATION,
            buyer_id: BUYER,
            seller_id: SELLER,
            last_message: None,
            last_message_at: None,
            unread_count: 0,
        }
    }

    fn price_draft(price: f64) -> ProposalDraft {
        ProposalDraft {
            kind: ProposalKind::Price,
            description: format!("Te ofrezco {price}"),
            proposed_price: Some(price),
            conditions: None,
            meeting: None,
        }
    }

    fn meeting() -> MeetingDetails {
        MeetingDetails {
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            time: NaiveTime::from_hms_opt(15, 0, 0),
            place: "Mall X".to_string(),
            notes: None,
        }
    }

    /// In-memory stand-in for the remote negotiation service, applying the
    /// same transitions the real one would
    #[derive(Default)]
    struct FakeNegotiation {
        proposals: Mutex<Vec<Proposal>>,
        exchanges: Mutex<Vec<Exchange>>,
        next_proposal: AtomicI64,
        next_exchange: AtomicI64,
        accept_calls: AtomicUsize,
        validate_calls: AtomicUsize,
    }

    impl FakeNegotiation {
        fn proposal(&self, id: ProposalId) -> Proposal {
            self.proposals
                .lock()
                .unwrap()
                .iter()
                .find(|proposal| proposal.id == id)
                .cloned()
                .expect("unknown proposal")
        }

        fn other_party(&self, proposal: &Proposal, actor: UserId) -> UserId {
            if proposal.proposer.id == actor {
                proposal.receiver.id
            } else {
                proposal.proposer.id
            }
        }
    }

    #[async_trait]
    impl NegotiationBackend for FakeNegotiation {
        async fn list_proposals(&self, conversation: ConversationId) -> Result<Vec<Proposal>> {
            Ok(self
                .proposals
                .lock()
                .unwrap()
                .iter()
                .filter(|proposal| proposal.conversation_id == conversation)
                .cloned()
                .collect())
        }

        async fn create_proposal(
            &self,
            conversation: ConversationId,
            actor: UserId,
            draft: &ProposalDraft,
        ) -> Result<Proposal> {
            let id = self.next_proposal.fetch_add(1, Ordering::SeqCst) + 1;
            let receiver = if actor == BUYER { SELLER } else { BUYER };
            let proposal = Proposal {
                id: ProposalId(id),
                conversation_id: conversation,
                kind: draft.kind,
                description: draft.description.clone(),
                proposed_price: draft.proposed_price,
                conditions: draft.conditions.clone(),
                meeting: draft.meeting.clone(),
                status: ProposalStatus::Pending,
                created_at: Utc::now(),
                responded_at: None,
                response: None,
                proposer: UserRef::bare(actor),
                receiver: UserRef::bare(receiver),
            };
            self.proposals.lock().unwrap().push(proposal.clone());
            Ok(proposal)
        }

        async fn accept_proposal(
            &self,
            proposal: ProposalId,
            _actor: UserId,
            meeting: &MeetingDetails,
        ) -> Result<ProposalUpdate> {
            self.accept_calls.fetch_add(1, Ordering::SeqCst);
            let mut proposals = self.proposals.lock().unwrap();
            let entry = proposals
                .iter_mut()
                .find(|entry| entry.id == proposal)
                .expect("unknown proposal");
            entry.status = ProposalStatus::Accepted;
            entry.meeting = Some(meeting.clone());
            entry.responded_at = Some(Utc::now());
            let accepted = entry.clone();
            drop(proposals);

            let id = self.next_exchange.fetch_add(1, Ordering::SeqCst) + 1;
            let exchange = Exchange {
                id: ExchangeId(id),
                proposal_id: accepted.id,
                conversation_id: accepted.conversation_id,
                status: ExchangeStatus::PendingValidation,
                validations: Vec::new(),
            };
            self.exchanges.lock().unwrap().push(exchange.clone());
            Ok(ProposalUpdate {
                proposal: accepted,
                exchange: Some(exchange),
            })
        }

        async fn reject_proposal(
            &self,
            proposal: ProposalId,
            _actor: UserId,
            reason: Option<&str>,
        ) -> Result<ProposalUpdate> {
            let mut proposals = self.proposals.lock().unwrap();
            let entry = proposals
                .iter_mut()
                .find(|entry| entry.id == proposal)
                .expect("unknown proposal");
            entry.status = ProposalStatus::Rejected;
            entry.response = reason.map(ToString::to_string);
            entry.responded_at = Some(Utc::now());
            Ok(ProposalUpdate {
                proposal: entry.clone(),
                exchange: None,
            })
        }

        async fn counter_proposal(
            &self,
            proposal: ProposalId,
            actor: UserId,
            draft: &ProposalDraft,
        ) -> Result<CounterUpdate> {
            let superseded = {
                let mut proposals = self.proposals.lock().unwrap();
                let entry = proposals
                    .iter_mut()
                    .find(|entry| entry.id == proposal)
                    .expect("unknown proposal");
                entry.status = ProposalStatus::Countered;
                entry.responded_at = Some(Utc::now());
                entry.clone()
            };

            let receiver = self.other_party(&superseded, actor);
            let id = self.next_proposal.fetch_add(1, Ordering::SeqCst) + 1;
            let replacement = Proposal {
                id: ProposalId(id),
                conversation_id: superseded.conversation_id,
                kind: draft.kind,
                description: draft.description.clone(),
                proposed_price: draft.proposed_price,
                conditions: draft.conditions.clone(),
                meeting: draft.meeting.clone(),
                status: ProposalStatus::Pending,
                created_at: Utc::now(),
                responded_at: None,
                response: None,
                proposer: UserRef::bare(actor),
                receiver: UserRef::bare(receiver),
            };
            self.proposals.lock().unwrap().push(replacement.clone());
            Ok(CounterUpdate {
                superseded,
                proposal: replacement,
            })
        }

        async fn cancel_proposal(&self, proposal: ProposalId, _actor: UserId) -> Result<Proposal> {
            let mut proposals = self.proposals.lock().unwrap();
            let entry = proposals
                .iter_mut()
                .find(|entry| entry.id == proposal)
                .expect("unknown proposal");
            entry.status = ProposalStatus::Cancelled;
            entry.responded_at = Some(Utc::now());
            Ok(entry.clone())
        }

        async fn fetch_exchange(&self, exchange: ExchangeId) -> Result<Exchange> {
            self.exchanges
                .lock()
                .unwrap()
                .iter()
                .find(|entry| entry.id == exchange)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("exchange {exchange}")))
        }

        async fn validate_exchange(
            &self,
            exchange: ExchangeId,
            actor: UserId,
            input: &ValidationInput,
        ) -> Result<Exchange> {
            self.validate_calls.fetch_add(1, Ordering::SeqCst);
            let mut exchanges = self.exchanges.lock().unwrap();
            let entry = exchanges
                .iter_mut()
                .find(|entry| entry.id == exchange)
                .expect("unknown exchange");
            entry.validations.push(Validation {
                user_id: actor,
                is_successful: input.is_successful,
                comment: input.comment.clone(),
                rating: input.rating,
                validated_at: Utc::now(),
            });
            entry.status = entry.resolved_status();
            Ok(entry.clone())
        }
    }

    /// Sink recording appended system messages
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(ConversationId, String)>>,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn post_text(&self, conversation: ConversationId, text: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((conversation, text.to_string()));
            Ok(())
        }
    }

    struct Harness {
        backend: Arc<FakeNegotiation>,
        sink: Arc<RecordingSink>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                backend: Arc::new(FakeNegotiation::default()),
                sink: Arc::new(RecordingSink::default()),
            }
        }

        fn engine_as(&self, user: UserId) -> ProposalEngine {
            ProposalEngine::new(
                Arc::clone(&self.backend) as Arc<dyn NegotiationBackend>,
                Arc::clone(&self.sink) as Arc<dyn MessageSink>,
                Arc::new(StaticSessionProvider::new(Session::new(user, "token"))),
            )
        }
    }

    fn validation(is_successful: bool) -> ValidationInput {
        ValidationInput {
            is_successful,
            comment: None,
            rating: None,
            aspects: None,
        }
    }

    #[tokio::test]
    async fn full_negotiation_reaches_completed() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);
        let seller = harness.engine_as(SELLER);

        let proposal = buyer
            .create(&conversation(), price_draft(150_000.0))
            .await
            .unwrap();
        assert_eq!(proposal.status, ProposalStatus::Pending);

        let update = seller
            .accept(CONVERSATION, proposal.id, Some(meeting()))
            .await
            .unwrap();
        assert_eq!(update.proposal.status, ProposalStatus::Accepted);
        let exchange = update.exchange.unwrap();
        assert_eq!(exchange.status, ExchangeStatus::PendingValidation);

        let sent = harness.sink.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, CONVERSATION);
        assert!(sent[0].1.starts_with("Propuesta aceptada"));
        assert!(sent[0].1.contains("Mall X"));

        let outcome = buyer
            .validate(exchange.id, validation(true))
            .await
            .unwrap();
        assert_eq!(
            outcome.exchange().status,
            ExchangeStatus::PendingValidation
        );

        let outcome = seller
            .validate(exchange.id, validation(true))
            .await
            .unwrap();
        assert_eq!(outcome.exchange().status, ExchangeStatus::Completed);
    }

    #[tokio::test]
    async fn failed_validation_fails_the_exchange() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);
        let seller = harness.engine_as(SELLER);

        let proposal = buyer
            .create(&conversation(), price_draft(80_000.0))
            .await
            .unwrap();
        let exchange = seller
            .accept(CONVERSATION, proposal.id, Some(meeting()))
            .await
            .unwrap()
            .exchange
            .unwrap();

        buyer
            .validate(exchange.id, validation(true))
            .await
            .unwrap();
        let outcome = seller
            .validate(exchange.id, validation(false))
            .await
            .unwrap();
        assert_eq!(outcome.exchange().status, ExchangeStatus::Failed);
    }

    #[tokio::test]
    async fn create_is_forbidden_for_the_seller() {
        let harness = Harness::new();
        let seller = harness.engine_as(SELLER);

        let result = seller.create(&conversation(), price_draft(10_000.0)).await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
        assert!(harness.backend.proposals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn proposer_cannot_respond_to_their_own_offer() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);

        let proposal = buyer
            .create(&conversation(), price_draft(10_000.0))
            .await
            .unwrap();

        assert!(matches!(
            buyer
                .accept(CONVERSATION, proposal.id, Some(meeting()))
                .await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            buyer.reject(CONVERSATION, proposal.id, None).await,
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn second_accept_conflicts_and_mutates_nothing() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);
        let seller = harness.engine_as(SELLER);

        let first = buyer
            .create(&conversation(), price_draft(10_000.0))
            .await
            .unwrap();
        let second = buyer
            .create(&conversation(), price_draft(12_000.0))
            .await
            .unwrap();

        seller
            .accept(CONVERSATION, first.id, Some(meeting()))
            .await
            .unwrap();
        let result = seller.accept(CONVERSATION, second.id, Some(meeting())).await;
        assert!(matches!(result, Err(Error::Conflict(_))));

        // The losing accept never reached the backend and both proposals kept
        // their states.
        assert_eq!(harness.backend.accept_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            harness.backend.proposal(first.id).status,
            ProposalStatus::Accepted
        );
        assert_eq!(
            harness.backend.proposal(second.id).status,
            ProposalStatus::Pending
        );
    }

    #[tokio::test]
    async fn accept_without_meeting_details_is_blocked_before_network() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);
        let seller = harness.engine_as(SELLER);

        let proposal = buyer
            .create(&conversation(), price_draft(10_000.0))
            .await
            .unwrap();

        let result = seller.accept(CONVERSATION, proposal.id, None).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(harness.backend.accept_calls.load(Ordering::SeqCst), 0);
        assert!(harness.sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reject_records_the_reason() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);
        let seller = harness.engine_as(SELLER);

        let proposal = buyer
            .create(&conversation(), price_draft(10_000.0))
            .await
            .unwrap();
        let update = seller
            .reject(CONVERSATION, proposal.id, Some("Muy poco".to_string()))
            .await
            .unwrap();

        assert_eq!(update.proposal.status, ProposalStatus::Rejected);
        assert_eq!(update.proposal.response.as_deref(), Some("Muy poco"));
        assert!(update.proposal.responded_at.is_some());
        assert!(update.exchange.is_none());
    }

    #[tokio::test]
    async fn counter_supersedes_and_flips_sides() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);
        let seller = harness.engine_as(SELLER);

        let proposal = buyer
            .create(&conversation(), price_draft(10_000.0))
            .await
            .unwrap();
        let update = seller
            .counter(CONVERSATION, proposal.id, price_draft(14_000.0))
            .await
            .unwrap();

        assert_eq!(update.superseded.status, ProposalStatus::Countered);
        assert_eq!(update.proposal.status, ProposalStatus::Pending);
        assert_eq!(update.proposal.proposer.id, SELLER);
        assert_eq!(update.proposal.receiver.id, BUYER);

        // The original buyer now holds the responder role for the counter.
        let accepted = buyer
            .accept(CONVERSATION, update.proposal.id, Some(meeting()))
            .await
            .unwrap();
        assert_eq!(accepted.proposal.status, ProposalStatus::Accepted);
    }

    #[tokio::test]
    async fn cancel_is_proposer_only() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);
        let seller = harness.engine_as(SELLER);

        let proposal = buyer
            .create(&conversation(), price_draft(10_000.0))
            .await
            .unwrap();

        assert!(matches!(
            seller.cancel(CONVERSATION, proposal.id).await,
            Err(Error::Forbidden(_))
        ));

        let cancelled = buyer.cancel(CONVERSATION, proposal.id).await.unwrap();
        assert_eq!(cancelled.status, ProposalStatus::Cancelled);
    }

    #[tokio::test]
    async fn repeated_validation_is_a_noop_success() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);
        let seller = harness.engine_as(SELLER);

        let proposal = buyer
            .create(&conversation(), price_draft(10_000.0))
            .await
            .unwrap();
        let exchange = seller
            .accept(CONVERSATION, proposal.id, Some(meeting()))
            .await
            .unwrap()
            .exchange
            .unwrap();

        let first = buyer
            .validate(exchange.id, validation(true))
            .await
            .unwrap();
        assert!(!first.is_repeat());

        let second = buyer
            .validate(exchange.id, validation(false))
            .await
            .unwrap();
        assert!(second.is_repeat());
        assert_eq!(
            second.exchange().status,
            ExchangeStatus::PendingValidation
        );
        assert_eq!(harness.backend.validate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn validation_by_a_stranger_is_forbidden() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);
        let seller = harness.engine_as(SELLER);
        let stranger = harness.engine_as(UserId(9));

        let proposal = buyer
            .create(&conversation(), price_draft(10_000.0))
            .await
            .unwrap();
        let exchange = seller
            .accept(CONVERSATION, proposal.id, Some(meeting()))
            .await
            .unwrap()
            .exchange
            .unwrap();

        assert!(matches!(
            stranger
                .validate(exchange.id, validation(true))
                .await,
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected_locally() {
        let harness = Harness::new();
        let buyer = harness.engine_as(BUYER);

        let input = ValidationInput {
            is_successful: true,
            comment: None,
            rating: Some(6),
            aspects: None,
        };
        assert!(matches!(
            buyer.validate(ExchangeId(1), input).await,
            Err(Error::Validation(_))
        ));
        assert_eq!(harness.backend.validate_calls.load(Ordering::SeqCst), 0);
    }
}

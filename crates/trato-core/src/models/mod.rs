//! Domain models shared across the engine

pub mod conversation;
pub mod exchange;
pub mod message;
pub mod proposal;
pub mod user;

pub use conversation::{Conversation, ConversationId};
pub use exchange::{Exchange, ExchangeId, ExchangeStatus, Validation, ValidationInput};
pub use message::{Message, MessageId, MessageKind};
pub use proposal::{
    MeetingDetails, Proposal, ProposalDraft, ProposalId, ProposalKind, ProposalStatus,
};
pub use user::{UserId, UserRef};

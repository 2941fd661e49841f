//! trato-core - Core library for Trato
//!
//! Client-side engine for a classifieds marketplace's peer-to-peer
//! negotiation layer: the message reconciliation pipeline (optimistic send,
//! realtime push, catch-up poll merged into one ordered thread) and the
//! proposal/exchange state machine with role-gated permissions. Persistence,
//! auth issuance, and rendering live outside this crate.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod proposals;
pub mod realtime;
pub mod roles;
pub mod session;
pub mod util;

pub use chat::{ChatClient, ChatEvent, ChatHandle, ChatSnapshot};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{Conversation, ConversationId, Message, MessageId, Proposal, ProposalId};
pub use proposals::ProposalEngine;
pub use roles::{resolve_role, Role};
pub use session::{Session, SessionProvider};

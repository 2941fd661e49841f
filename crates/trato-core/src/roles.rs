//! Role resolution for negotiation permissions.
//!
//! Every permission decision in the proposal engine starts here: the buyer
//! (proposer side) is the only party who may open a proposal, the seller
//! (receiver side) the only one who may respond. Other components query this
//! module instead of re-deriving role logic from participant ids.

use crate::models::UserId;

/// A participant's side in a negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The initiating/interested party; opens proposals
    Buyer,
    /// The listing owner; responds to proposals
    Seller,
}

impl Role {
    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }
}

/// The two sides of an exchange, by user id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeParticipants {
    /// The initiating party (buyer side)
    pub proposer_id: UserId,
    /// The receiving party (seller side)
    pub receiver_id: UserId,
}

/// Derive `current_user`'s role from the exchange participants.
///
/// Returns `None` when the user is on neither side; every mutating
/// negotiation operation must then be refused.
#[must_use]
pub fn resolve_role(current_user: UserId, participants: ExchangeParticipants) -> Option<Role> {
    if current_user == participants.proposer_id {
        Some(Role::Buyer)
    } else if current_user == participants.receiver_id {
        Some(Role::Seller)
    } else {
        None
    }
}

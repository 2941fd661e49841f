//! Session and identity context.
//!
//! The engine never caches credentials: adapters ask the provider for a fresh
//! session on every remote call, so token refresh stays the identity
//! provider's concern.

use std::fmt;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::models::UserId;

/// An authenticated identity: the current user and their bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// The signed-in user
    pub user_id: UserId,
    /// Opaque bearer token consumed by the remote services
    pub access_token: String,
}

impl Session {
    /// Create a session from a user id and token
    pub fn new(user_id: UserId, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Source of the current session, queried per remote call
pub trait SessionProvider: Send + Sync {
    /// The current session, or `Unauthorized` when none is active
    fn session(&self) -> Result<Session>;

    /// Convenience accessor for the signed-in user id
    fn current_user(&self) -> Result<UserId> {
        Ok(self.session()?.user_id)
    }
}

/// In-memory provider backed by an optional session slot.
///
/// Used by the CLI (session loaded from the profile store) and by tests.
pub struct StaticSessionProvider {
    slot: RwLock<Option<Session>>,
}

impl StaticSessionProvider {
    /// Provider that always yields the given session
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            slot: RwLock::new(Some(session)),
        }
    }

    /// Provider with no active session; every call yields `Unauthorized`
    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Replace the active session (e.g. after a token refresh)
    pub fn replace(&self, session: Option<Session>) {
        *self.slot.write().expect("session slot poisoned") = session;
    }
}

impl SessionProvider for StaticSessionProvider {
    fn session(&self) -> Result<Session> {
        self.slot
            .read()
            .expect("session slot poisoned")
            .clone()
            .ok_or_else(|| Error::Unauthorized("no active session".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let session = Session::new(UserId(1), "secret-token");
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn signed_out_provider_is_unauthorized() {
        let provider = StaticSessionProvider::signed_out();
        assert!(matches!(
            provider.session(),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn replace_swaps_the_active_session() {
        let provider = StaticSessionProvider::signed_out();
        provider.replace(Some(Session::new(UserId(5), "token")));
        assert_eq!(provider.current_user().unwrap(), UserId(5));
    }
}

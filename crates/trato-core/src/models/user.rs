//! User identifiers and participant references

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// A unique identifier for a marketplace user, assigned by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Raw numeric value of this ID
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Minimal participant reference attached to proposals and exchanges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Unique identifier
    pub id: UserId,
    /// Display name; may be empty when the remote omits it
    pub name: String,
    /// Avatar URL, when one is set
    pub avatar_url: Option<String>,
}

impl UserRef {
    /// Reference carrying only an id, for payloads that omit profile data
    #[must_use]
    pub const fn bare(id: UserId) -> Self {
        Self {
            id,
            name: String::new(),
            avatar_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parse_roundtrip() {
        let id = UserId(42);
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn bare_ref_has_empty_profile() {
        let user = UserRef::bare(UserId(7));
        assert_eq!(user.id, UserId(7));
        assert!(user.name.is_empty());
        assert!(user.avatar_url.is_none());
    }
}

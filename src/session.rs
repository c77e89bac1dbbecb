use fuels::types::Identity;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// Scopes all queued soul state. A confirmation only applies when both the
/// player and the session id match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKey {
    pub player: Identity,
    pub session_id: u64,
}

impl SessionKey {
    pub fn new(player: Identity, session_id: u64) -> Self {
        Self { player, session_id }
    }

    pub fn matches(&self, player: &Identity, session_id: u64) -> bool {
        self.session_id == session_id && &self.player == player
    }

    pub fn cache_key(&self) -> String {
        format!("{}/{}", identity_key(&self.player), self.session_id)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", identity_key(&self.player), self.session_id)
    }
}

pub fn identity_key(player: &Identity) -> String {
    format!("{:?}", player)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use fuels::types::Address;

    #[test]
    fn matches__requires_same_player_and_session() {
        // given
        let alice = Identity::Address(Address::from([1u8; 32]));
        let bob = Identity::Address(Address::from([2u8; 32]));
        let key = SessionKey::new(alice.clone(), 7);

        // then
        assert!(key.matches(&alice, 7));
        assert!(!key.matches(&alice, 8));
        assert!(!key.matches(&bob, 7));
    }

    #[test]
    fn cache_key__differs_per_session() {
        let alice = Identity::Address(Address::from([1u8; 32]));
        let first = SessionKey::new(alice.clone(), 1);
        let second = SessionKey::new(alice, 2);

        assert_ne!(first.cache_key(), second.cache_key());
    }
}

//! Seam to the authentication provider. The engine only ever asks "who is playing?".

use std::sync::{Arc, RwLock};

use quiz_core::model::UserId;

pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// A fixed, already authenticated player.
#[derive(Debug, Clone, Copy)]
pub struct SignedInUser(pub UserId);

impl IdentityProvider for SignedInUser {
    fn current_user_id(&self) -> Option<UserId> {
        Some(self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignedOut;

impl IdentityProvider for SignedOut {
    fn current_user_id(&self) -> Option<UserId> {
        None
    }
}

/// Identity that can change at runtime, e.g. when the host signs a player in or out.
#[derive(Debug, Clone, Default)]
pub struct SharedIdentity {
    inner: Arc<RwLock<Option<UserId>>>,
}

impl SharedIdentity {
    #[must_use]
    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(user_id))),
        }
    }

    pub fn sign_in(&self, user_id: UserId) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(user_id);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = None;
        }
    }
}

impl IdentityProvider for SharedIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.inner.read().ok().and_then(|guard| *guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn shared_identity_tracks_sign_in_and_out() {
        let identity = SharedIdentity::default();
        assert_eq!(identity.current_user_id(), None);

        let user = UserId::new(Uuid::new_v4());
        identity.sign_in(user);
        assert_eq!(identity.current_user_id(), Some(user));

        let clone = identity.clone();
        clone.sign_out();
        assert_eq!(identity.current_user_id(), None);
    }

    #[test]
    fn static_providers() {
        let user = UserId::new(Uuid::new_v4());
        assert_eq!(SignedInUser(user).current_user_id(), Some(user));
        assert_eq!(SignedOut.current_user_id(), None);
    }
}

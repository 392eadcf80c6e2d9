use crate::session::{Session, SessionStore};

use super::types::UserAccount;

/// A user registered for the duration of a check.
///
/// Holds the user's session in the store. Dropping the guard without going
/// through `AuthorizationCodeFlow::remove_user` still releases the session.
pub struct RegisteredUser {
    account: UserAccount,
    store: SessionStore,
    released: bool,
}

impl RegisteredUser {
    pub(crate) fn new(account: UserAccount, store: SessionStore) -> Self {
        Self {
            account,
            store,
            released: false,
        }
    }

    pub fn account(&self) -> &UserAccount {
        &self.account
    }

    pub fn username(&self) -> &str {
        &self.account.username
    }

    pub fn session(&self) -> Option<Session> {
        self.store.get(&self.account.username).ok()
    }

    pub(crate) fn release(&mut self) {
        if !self.released {
            if let Err(e) = self.store.remove(&self.account.username) {
                tracing::error!("Failed to release session for {}: {}", self.account.username, e);
            }
            self.released = true;
        }
    }
}

impl Drop for RegisteredUser {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                "Releasing session for {} without account removal",
                self.account.username
            );
            self.release();
        }
    }
}

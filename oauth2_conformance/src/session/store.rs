use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::errors::SessionError;
use super::types::{Session, SessionConfig};

/// Per-user session map.
///
/// Entries are independent, so flows for distinct usernames can run
/// concurrently. Two flows sharing a username at the same time would share
/// a cookie jar and are not supported.
#[derive(Clone, Default)]
pub struct SessionStore {
    config: SessionConfig,
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates the session for `username`.
    ///
    /// Fails if one already exists, since replacing it would discard the
    /// cookies of a flow in progress.
    pub fn create(&self, username: &str) -> Result<Session, SessionError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| SessionError::LockPoisoned)?;

        if sessions.contains_key(username) {
            tracing::error!("Session for {} already exists", username);
            return Err(SessionError::AlreadyExists(username.to_string()));
        }

        let session = Session::new(username, &self.config)?;
        sessions.insert(username.to_string(), session.clone());
        tracing::debug!("Created session for {}", username);
        Ok(session)
    }

    pub fn get(&self, username: &str) -> Result<Session, SessionError> {
        self.sessions
            .lock()
            .map_err(|_| SessionError::LockPoisoned)?
            .get(username)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(username.to_string()))
    }

    /// Releases the session of `username`. Removing an absent entry is a no-op.
    pub fn remove(&self, username: &str) -> Result<(), SessionError> {
        let removed = self
            .sessions
            .lock()
            .map_err(|_| SessionError::LockPoisoned)?
            .remove(username);

        match removed {
            Some(_) => tracing::debug!("Removed session for {}", username),
            None => tracing::debug!("No session to remove for {}", username),
        }
        Ok(())
    }

    pub fn contains(&self, username: &str) -> Result<bool, SessionError> {
        self.sessions
            .lock()
            .map(|sessions| sessions.contains_key(username))
            .map_err(|_| SessionError::LockPoisoned)
    }

    pub fn len(&self) -> Result<usize, SessionError> {
        self.sessions
            .lock()
            .map(|sessions| sessions.len())
            .map_err(|_| SessionError::LockPoisoned)
    }

    pub fn is_empty(&self) -> Result<bool, SessionError> {
        Ok(self.len()? == 0)
    }
}

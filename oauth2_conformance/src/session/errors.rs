use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found for user: {0}")]
    NotFound(String),

    #[error("Session already exists for user: {0}")]
    AlreadyExists(String),

    #[error("Http client error: {0}")]
    HttpClient(String),

    #[error("Session store lock poisoned")]
    LockPoisoned,
}

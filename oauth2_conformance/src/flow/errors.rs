use http::StatusCode;
use thiserror::Error;
use url::Url;

use crate::session::SessionError;
use crate::utils::UtilError;

/// Hard failures of a flow.
///
/// Protocol-level errors reported by the server (`error=access_denied` and
/// friends) are not represented here. They travel inside the terminal
/// response as a [`ProtocolError`](super::ProtocolError).
#[derive(Debug, Error)]
pub enum ConformanceError {
    #[error("Session not found for user: {0}")]
    SessionNotFound(String),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { url: Url, status: StatusCode },

    #[error("Redirect chain exceeded {limit} hops")]
    TooManyRedirects { limit: usize },

    #[error("Response from {0} has no redirect target")]
    MissingRedirectTarget(Url),

    #[error("Invalid redirect target '{location}': {reason}")]
    InvalidRedirectTarget { location: String, reason: String },

    #[error("Terminal response carries no authorization code")]
    MissingAuthorizationCode,

    #[error("Token response carries no access token")]
    MissingAccessToken,

    #[error("Requested scopes missing from response: {missing:?}")]
    ScopeMismatch { missing: Vec<String> },

    #[error("Server does not conform: {0}")]
    NonConformance(String),

    #[error("Http error: {0}")]
    Http(String),

    #[error("Serde error: {0}")]
    Serde(String),

    #[error("Strategy error: {0}")]
    Strategy(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid flow transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Session error: {0}")]
    Session(SessionError),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl From<SessionError> for ConformanceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(username) => Self::SessionNotFound(username),
            other => Self::Session(other),
        }
    }
}

impl From<reqwest::Error> for ConformanceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

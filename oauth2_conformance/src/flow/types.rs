use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use http::{HeaderMap, StatusCode, header::LOCATION};
use serde::{Deserialize, Serialize};
use url::Url;

use super::errors::ConformanceError;
use super::redirect::resolve_target;

/// OAuth client registered with the server under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl Client {
    pub fn new(client_id: &str, redirect_uri: &str, scopes: &[&str]) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: None,
            redirect_uri: redirect_uri.to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_secret(mut self, secret: &str) -> Self {
        self.client_secret = Some(secret.to_string());
        self
    }

    /// Copy of this client that claims a different redirect URI.
    pub fn with_redirect_uri(&self, redirect_uri: &str) -> Self {
        Self {
            redirect_uri: redirect_uri.to_string(),
            ..self.clone()
        }
    }
}

/// Resource owner the flow logs in as.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub password: String,
}

impl UserAccount {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn with_password(&self, password: &str) -> Self {
        Self::new(&self.username, password)
    }
}

impl fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccount")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Caller knobs for a single authorization request.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationOptions {
    /// Requested scopes. `None` lets the operation pick its default.
    pub scopes: Option<Vec<String>>,
    /// Whether the consent step approves. Defaults to approve.
    pub should_consent: Option<bool>,
    /// Extra authorize parameters, overriding the defaults on key collision.
    pub extra_params: BTreeMap<String, String>,
}

impl AuthorizationOptions {
    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = Some(scopes.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn deny_consent(mut self) -> Self {
        self.should_consent = Some(false);
        self
    }

    pub fn with_extra_param(mut self, key: &str, value: &str) -> Self {
        self.extra_params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn should_consent(&self) -> bool {
        self.should_consent.unwrap_or(true)
    }
}

/// Code returned by a successful flow, with the scopes the server reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCodeDetails {
    pub authorization_code: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenDetails {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub scopes: Vec<String>,
    pub refresh_token: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl AccessTokenDetails {
    /// `None` when no lifetime was given or it does not fit a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| self.issued_at.checked_add_signed(lifetime))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenResponse {
    pub access_token_details: AccessTokenDetails,
}

/// Error reported by the server through the protocol (`error=<code>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ProtocolError {
    pub fn is(&self, code: &str) -> bool {
        self.error == code
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Outcome of a token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenExchange {
    Issued(AccessTokenResponse),
    Rejected(ProtocolError),
}

impl TokenExchange {
    pub fn access_token(&self) -> Option<&AccessTokenResponse> {
        match self {
            Self::Issued(response) => Some(response),
            Self::Rejected(_) => None,
        }
    }

    pub fn protocol_error(&self) -> Option<&ProtocolError> {
        match self {
            Self::Issued(_) => None,
            Self::Rejected(err) => Some(err),
        }
    }
}

/// One HTTP response observed by the flow.
///
/// The body is read eagerly so strategies can inspect the page, and the
/// `Location` header is resolved against the origin of the request URL.
#[derive(Debug, Clone)]
pub struct FlowResponse {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub location: Option<Url>,
    pub body: String,
}

impl FlowResponse {
    pub async fn from_response(response: reqwest::Response) -> Result<Self, ConformanceError> {
        let url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Self::from_parts(url, status, headers, body)
    }

    pub fn from_parts(
        url: Url,
        status: StatusCode,
        headers: HeaderMap,
        body: String,
    ) -> Result<Self, ConformanceError> {
        let location = match headers.get(LOCATION) {
            Some(value) => {
                let raw = value.to_str().map_err(|e| ConformanceError::InvalidRedirectTarget {
                    location: format!("{value:?}"),
                    reason: e.to_string(),
                })?;
                Some(resolve_target(&url, raw)?)
            }
            None => None,
        };

        Ok(Self {
            url,
            status,
            headers,
            location,
            body,
        })
    }

    pub fn is_redirect(&self) -> bool {
        self.location.is_some()
    }

    /// First value of `key` in the redirect target's query string.
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.location.as_ref().and_then(|target| {
            target
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        })
    }

    /// Whether the redirect target reports a protocol error.
    pub fn has_error(&self) -> bool {
        self.query_param("error").is_some()
    }
}

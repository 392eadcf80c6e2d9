//! Central configuration for the oauth2_conformance crate
//!
//! Values are read from the environment once. Binaries are expected to load
//! a `.env` file before the first access.

use std::{env, sync::LazyLock, time::Duration};
use url::Url;

use crate::flow::ConformanceError;
use crate::utils::split_scopes;

/// Upper bound on redirect hops a single flow may walk
/// Default: 5
pub(crate) static O2C_MAX_REDIRECT_HOPS: LazyLock<usize> = LazyLock::new(|| {
    env::var("O2C_MAX_REDIRECT_HOPS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5)
});

/// Transport timeout for every request, in seconds
pub(crate) static O2C_HTTP_TIMEOUT: LazyLock<Duration> = LazyLock::new(|| {
    let secs = env::var("O2C_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);
    Duration::from_secs(secs)
});

static O2C_AUTHORIZATION_ENDPOINT: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("O2C_AUTHORIZATION_ENDPOINT").ok());

static O2C_TOKEN_ENDPOINT: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("O2C_TOKEN_ENDPOINT").ok());

static O2C_AVAILABLE_SCOPES: LazyLock<Vec<String>> = LazyLock::new(|| {
    split_scopes(&env::var("O2C_AVAILABLE_SCOPES").unwrap_or("read write".to_string()))
});

/// Describes the authorization server under test.
pub trait OAuthProperties: Send + Sync {
    fn authorization_endpoint(&self) -> Url;

    fn token_endpoint(&self) -> Url;

    /// Scopes the server is expected to grant to test clients.
    fn available_scopes(&self) -> Vec<String>;
}

/// Fixed endpoint and scope description of a server.
#[derive(Debug, Clone)]
pub struct ServerProperties {
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub available_scopes: Vec<String>,
}

impl ServerProperties {
    pub fn new(authorization_endpoint: Url, token_endpoint: Url, available_scopes: Vec<String>) -> Self {
        Self {
            authorization_endpoint,
            token_endpoint,
            available_scopes,
        }
    }

    /// Builds properties from `O2C_*` environment variables.
    pub fn from_env() -> Result<Self, ConformanceError> {
        let authorization_endpoint = parse_endpoint(
            "O2C_AUTHORIZATION_ENDPOINT",
            O2C_AUTHORIZATION_ENDPOINT.as_deref(),
        )?;
        let token_endpoint = parse_endpoint("O2C_TOKEN_ENDPOINT", O2C_TOKEN_ENDPOINT.as_deref())?;

        tracing::debug!(
            "Server properties from environment: authorize={}, token={}, scopes={:?}",
            authorization_endpoint,
            token_endpoint,
            *O2C_AVAILABLE_SCOPES
        );

        Ok(Self::new(
            authorization_endpoint,
            token_endpoint,
            O2C_AVAILABLE_SCOPES.clone(),
        ))
    }
}

impl OAuthProperties for ServerProperties {
    fn authorization_endpoint(&self) -> Url {
        self.authorization_endpoint.clone()
    }

    fn token_endpoint(&self) -> Url {
        self.token_endpoint.clone()
    }

    fn available_scopes(&self) -> Vec<String> {
        self.available_scopes.clone()
    }
}

fn parse_endpoint(name: &str, value: Option<&str>) -> Result<Url, ConformanceError> {
    let value = value.ok_or_else(|| ConformanceError::Config(format!("{name} must be set")))?;
    Url::parse(value).map_err(|e| ConformanceError::Config(format!("Invalid {name} '{value}': {e}")))
}

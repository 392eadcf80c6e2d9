use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use url::Url;

use crate::config::{O2C_HTTP_TIMEOUT, O2C_MAX_REDIRECT_HOPS};

use super::errors::SessionError;

/// How the HTTP boundary treats `Location` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// Every redirect is returned to the caller, which walks it hop by hop.
    Manual,
    /// The transport follows up to the given number of redirects on its own.
    Automatic(usize),
}

impl RedirectMode {
    fn policy(self) -> Policy {
        match self {
            Self::Manual => Policy::none(),
            Self::Automatic(max) => Policy::limited(max),
        }
    }
}

/// Settings shared by every session a [`SessionStore`](super::SessionStore) creates.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub redirect_mode: RedirectMode,
    pub max_redirect_hops: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            redirect_mode: RedirectMode::Manual,
            max_redirect_hops: *O2C_MAX_REDIRECT_HOPS,
            timeout: *O2C_HTTP_TIMEOUT,
            user_agent: format!("oauth2-conformance/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Cookie-bearing browser context of a single test user.
///
/// Clones share the same cookie jar and hop counter.
#[derive(Clone, Debug)]
pub struct Session {
    username: String,
    client: reqwest::Client,
    jar: Arc<Jar>,
    hops: Arc<AtomicUsize>,
    redirect_mode: RedirectMode,
    max_redirect_hops: usize,
}

impl Session {
    pub(crate) fn new(username: &str, config: &SessionConfig) -> Result<Self, SessionError> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .redirect(config.redirect_mode.policy())
            .cookie_provider(jar.clone())
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| SessionError::HttpClient(e.to_string()))?;

        Ok(Self {
            username: username.to_string(),
            client,
            jar,
            hops: Arc::new(AtomicUsize::new(0)),
            redirect_mode: config.redirect_mode,
            max_redirect_hops: config.max_redirect_hops,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// HTTP client carrying this session's cookies.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn redirect_mode(&self) -> RedirectMode {
        self.redirect_mode
    }

    pub fn max_redirect_hops(&self) -> usize {
        self.max_redirect_hops
    }

    /// `Cookie` header value the session would send to `url`, if any.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.jar
            .cookies(url)
            .and_then(|v| v.to_str().ok().map(|s| s.to_string()))
    }

    /// Resets the hop counter at the start of a flow.
    pub(crate) fn begin_flow(&self) {
        self.hops.store(0, Ordering::SeqCst);
    }

    /// Counts one redirect hop and returns the running total.
    pub(crate) fn record_hop(&self) -> usize {
        self.hops.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn hops(&self) -> usize {
        self.hops.load(Ordering::SeqCst)
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use crate::config::OAuthProperties;
use crate::session::{Session, SessionStore};

use super::errors::ConformanceError;
use super::extract::{extract_authorization_code, extract_error, extract_scopes};
use super::query::AuthorizeQuery;
use super::redirect::follow_redirect;
use super::scope::verify_scopes;
use super::strategy::FlowCapabilities;
use super::token::AccessTokenFetcher;
use super::types::{
    AuthorizationCodeDetails, AuthorizationOptions, Client, FlowResponse, TokenExchange,
    UserAccount,
};
use super::user::RegisteredUser;

/// Stage of a single authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Initiated,
    LoggingIn,
    ErrorAfterLogin,
    ConsentPending,
    Errored,
    Completed,
}

impl FlowState {
    pub fn can_advance_to(self, next: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, next),
            (Initiated, LoggingIn)
                | (Initiated, Errored)
                | (LoggingIn, ErrorAfterLogin)
                | (LoggingIn, ConsentPending)
                | (ErrorAfterLogin, Errored)
                | (ConsentPending, Errored)
                | (ConsentPending, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Errored | FlowState::Completed)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct FlowRun<'a> {
    username: &'a str,
    state: FlowState,
}

impl<'a> FlowRun<'a> {
    fn new(username: &'a str) -> Self {
        Self {
            username,
            state: FlowState::Initiated,
        }
    }

    fn advance(&mut self, next: FlowState) -> Result<(), ConformanceError> {
        if !self.state.can_advance_to(next) {
            return Err(ConformanceError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!("Flow for {}: {} -> {}", self.username, self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Authorize responses that end the flow before login.
fn is_terminal_authorize_response(response: &FlowResponse) -> bool {
    response.has_error() || !matches!(response.status, StatusCode::OK | StatusCode::FOUND)
}

/// Drives the Authorization Code grant as a scripted user agent.
pub struct AuthorizationCodeFlow {
    capabilities: FlowCapabilities,
    properties: Arc<dyn OAuthProperties>,
    token_fetcher: Arc<dyn AccessTokenFetcher>,
    sessions: SessionStore,
}

impl AuthorizationCodeFlow {
    pub fn new(
        capabilities: FlowCapabilities,
        properties: Arc<dyn OAuthProperties>,
        token_fetcher: Arc<dyn AccessTokenFetcher>,
    ) -> Self {
        Self {
            capabilities,
            properties,
            token_fetcher,
            sessions: SessionStore::default(),
        }
    }

    pub fn with_session_store(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn properties(&self) -> &dyn OAuthProperties {
        self.properties.as_ref()
    }

    /// Registers a generated account and opens its session.
    pub async fn register_user(&self) -> Result<RegisteredUser, ConformanceError> {
        let account = self.capabilities.accounts.generate_account().await?;
        self.register_account(account).await
    }

    /// Opens the session for `account`, then registers it with the server.
    ///
    /// The session is created first so a username already in use fails
    /// before the account directory is touched. If registration fails the
    /// session is released again and the registration error is returned.
    pub async fn register_account(
        &self,
        account: UserAccount,
    ) -> Result<RegisteredUser, ConformanceError> {
        self.sessions.create(&account.username)?;

        if let Err(e) = self.capabilities.accounts.register_account(&account).await {
            tracing::error!("Could not register account {}: {}", account.username, e);
            if let Err(rollback) = self.sessions.remove(&account.username) {
                tracing::error!(
                    "Could not release session for {} after failed registration: {}",
                    account.username,
                    rollback
                );
            }
            return Err(e);
        }

        tracing::info!("Registered user {}", account.username);
        Ok(RegisteredUser::new(account, self.sessions.clone()))
    }

    /// Releases the user's session, then removes the account.
    pub async fn remove_user(&self, mut user: RegisteredUser) -> Result<(), ConformanceError> {
        user.release();
        self.capabilities
            .accounts
            .remove_account(user.username())
            .await?;
        tracing::info!("Removed user {}", user.username());
        Ok(())
    }

    pub async fn register_client(
        &self,
        name: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<Client, ConformanceError> {
        self.capabilities
            .clients
            .generate_client(name, redirect_uri, scopes)
            .await
    }

    pub async fn remove_client(&self, name: &str) -> Result<(), ConformanceError> {
        self.capabilities.clients.remove_client(name).await
    }

    /// Sends the authorize request on behalf of the session's user.
    pub async fn send_authorize_request(
        &self,
        session: &Session,
        client: &Client,
        scopes: &[String],
        extra_params: &BTreeMap<String, String>,
    ) -> Result<FlowResponse, ConformanceError> {
        let url = AuthorizeQuery::new(client)
            .scopes(scopes)
            .extra_params(extra_params)
            .to_url(&self.properties.authorization_endpoint());

        tracing::debug!("Authorize request for {}: GET {}", session.username(), url);
        let response = session.client().get(url).send().await?;
        FlowResponse::from_response(response).await
    }

    /// Runs authorize, login and consent, returning the terminal response.
    ///
    /// Protocol errors are not raised: a response whose redirect target
    /// carries `error` is returned as-is. Consent is never attempted when
    /// the login step already produced an error. Scopes default to none,
    /// leaving the choice to the server.
    pub async fn request_authorization_code(
        &self,
        client: &Client,
        user: &UserAccount,
        options: &AuthorizationOptions,
    ) -> Result<FlowResponse, ConformanceError> {
        let session = self.sessions.get(&user.username)?;
        session.begin_flow();

        let mut run = FlowRun::new(&user.username);
        let requested = options.scopes.clone().unwrap_or_default();

        let authorize_response = self
            .send_authorize_request(&session, client, &requested, &options.extra_params)
            .await?;
        if is_terminal_authorize_response(&authorize_response) {
            run.advance(FlowState::Errored)?;
            tracing::info!(
                "Authorize request for {} ended the flow with status {}",
                user.username,
                authorize_response.status
            );
            return Ok(authorize_response);
        }

        run.advance(FlowState::LoggingIn)?;
        let submitted = self
            .capabilities
            .login
            .login(&authorize_response, user, &session)
            .await?;
        let after_login = follow_redirect(&submitted, &session).await?;

        if let Some(err) = extract_error(&after_login) {
            run.advance(FlowState::ErrorAfterLogin)?;
            run.advance(FlowState::Errored)?;
            tracing::info!("Login for {} ended with error: {}", user.username, err);
            return Ok(after_login);
        }

        run.advance(FlowState::ConsentPending)?;
        let consent_page = follow_redirect(&after_login, &session).await?;
        let terminal = self
            .capabilities
            .consent
            .consent(
                options.should_consent(),
                &consent_page,
                user,
                &session,
                &requested,
            )
            .await?;

        match extract_error(&terminal) {
            Some(err) => {
                run.advance(FlowState::Errored)?;
                tracing::info!("Consent for {} ended with error: {}", user.username, err);
            }
            None => {
                run.advance(FlowState::Completed)?;
                tracing::info!("Flow for {} completed", user.username);
            }
        }
        Ok(terminal)
    }

    /// Runs the flow and extracts the code, checking the granted scopes.
    ///
    /// Scopes default to every scope the server makes available.
    pub async fn fetch_authorization_code(
        &self,
        client: &Client,
        user: &UserAccount,
        options: &AuthorizationOptions,
    ) -> Result<AuthorizationCodeDetails, ConformanceError> {
        let requested = options
            .scopes
            .clone()
            .unwrap_or_else(|| self.properties.available_scopes());
        let options = AuthorizationOptions {
            scopes: Some(requested.clone()),
            ..options.clone()
        };

        let terminal = self
            .request_authorization_code(client, user, &options)
            .await?;

        if let Some(err) = extract_error(&terminal) {
            tracing::warn!("Expected a code for {}, got error: {}", user.username, err);
        }
        let authorization_code = extract_authorization_code(&terminal)?;
        let scopes = extract_scopes(&terminal, &requested);
        verify_scopes(&requested, &scopes)?;

        Ok(AuthorizationCodeDetails {
            authorization_code,
            scopes,
        })
    }

    pub async fn fetch_access_token(
        &self,
        client: &Client,
        details: &AuthorizationCodeDetails,
    ) -> Result<TokenExchange, ConformanceError> {
        self.token_fetcher.fetch_access_token(client, details).await
    }
}

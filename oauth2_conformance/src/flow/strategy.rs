use std::sync::Arc;

use async_trait::async_trait;

use crate::session::Session;

use super::errors::ConformanceError;
use super::redirect::{ensure_walkable_status, follow_redirect};
use super::types::{Client, FlowResponse, UserAccount};

/// Submits the user's credentials.
///
/// Receives the response of the authorize request and returns the response
/// to the credential submission, whose redirect the engine walks next.
#[async_trait]
pub trait LoginStrategy: Send + Sync {
    async fn login(
        &self,
        authorize_response: &FlowResponse,
        user: &UserAccount,
        session: &Session,
    ) -> Result<FlowResponse, ConformanceError>;
}

/// Approves or denies the consent page.
///
/// The returned response is the terminal response of the flow.
#[async_trait]
pub trait ConsentStrategy: Send + Sync {
    async fn consent(
        &self,
        should_consent: bool,
        consent_response: &FlowResponse,
        user: &UserAccount,
        session: &Session,
        requested_scopes: &[String],
    ) -> Result<FlowResponse, ConformanceError>;
}

/// Creates and deletes resource owners on the server under test.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn generate_account(&self) -> Result<UserAccount, ConformanceError>;

    async fn register_account(&self, user: &UserAccount) -> Result<(), ConformanceError>;

    async fn remove_account(&self, username: &str) -> Result<(), ConformanceError>;
}

/// Registers and deregisters OAuth clients on the server under test.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    async fn generate_client(
        &self,
        name: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<Client, ConformanceError>;

    async fn remove_client(&self, name: &str) -> Result<(), ConformanceError>;
}

/// Everything the engine delegates to the surrounding harness.
#[derive(Clone)]
pub struct FlowCapabilities {
    pub login: Arc<dyn LoginStrategy>,
    pub consent: Arc<dyn ConsentStrategy>,
    pub accounts: Arc<dyn AccountDirectory>,
    pub clients: Arc<dyn ClientRegistry>,
}

/// Logs in by posting a url-encoded form to the login page.
#[derive(Debug, Clone)]
pub struct FormLoginStrategy {
    pub username_field: String,
    pub password_field: String,
}

impl Default for FormLoginStrategy {
    fn default() -> Self {
        Self {
            username_field: "username".to_string(),
            password_field: "password".to_string(),
        }
    }
}

#[async_trait]
impl LoginStrategy for FormLoginStrategy {
    async fn login(
        &self,
        authorize_response: &FlowResponse,
        user: &UserAccount,
        session: &Session,
    ) -> Result<FlowResponse, ConformanceError> {
        // The authorize endpoint either renders the login page or redirects to it
        let login_page = if authorize_response.is_redirect() {
            follow_redirect(authorize_response, session).await?
        } else {
            authorize_response.clone()
        };

        tracing::debug!("Submitting credentials for {} to {}", user.username, login_page.url);
        let response = session
            .client()
            .post(login_page.url.clone())
            .form(&[
                (self.username_field.as_str(), user.username.as_str()),
                (self.password_field.as_str(), user.password.as_str()),
            ])
            .send()
            .await?;

        let response = FlowResponse::from_response(response).await?;
        ensure_walkable_status(&response)?;
        Ok(response)
    }
}

/// Posts the consent decision and requested scopes to the consent page.
#[derive(Debug, Clone)]
pub struct FormConsentStrategy {
    pub decision_field: String,
    pub approve_value: String,
    pub deny_value: String,
    pub scope_field: String,
}

impl Default for FormConsentStrategy {
    fn default() -> Self {
        Self {
            decision_field: "consent".to_string(),
            approve_value: "approve".to_string(),
            deny_value: "deny".to_string(),
            scope_field: "scope".to_string(),
        }
    }
}

#[async_trait]
impl ConsentStrategy for FormConsentStrategy {
    async fn consent(
        &self,
        should_consent: bool,
        consent_response: &FlowResponse,
        user: &UserAccount,
        session: &Session,
        requested_scopes: &[String],
    ) -> Result<FlowResponse, ConformanceError> {
        let decision = if should_consent {
            self.approve_value.as_str()
        } else {
            self.deny_value.as_str()
        };
        let scope = requested_scopes.join(" ");

        tracing::debug!(
            "Posting consent '{}' for {} to {}",
            decision,
            user.username,
            consent_response.url
        );
        let response = session
            .client()
            .post(consent_response.url.clone())
            .form(&[
                (self.decision_field.as_str(), decision),
                (self.scope_field.as_str(), scope.as_str()),
            ])
            .send()
            .await?;

        let response = FlowResponse::from_response(response).await?;
        ensure_walkable_status(&response)?;
        Ok(response)
    }
}

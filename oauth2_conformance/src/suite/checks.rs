use std::sync::Arc;

use http::StatusCode;
use url::Url;

use crate::flow::{
    AuthorizationCodeFlow, AuthorizationOptions, Client, ConformanceError, FlowResponse,
    TokenExchange, UserAccount, extract_error, verify_scopes,
};
use crate::utils::gen_random_string;

use super::types::{Check, CheckOutcome, SuiteReport};

/// Beyond this many client scopes only singletons and the full set are tried.
const MAX_SUBSET_SCOPES: usize = 6;

const UNREGISTERED_HOST: &str = "unregistered.invalid";

/// Runs every [`Check`] against one client, each with its own user.
pub struct ConformanceSuite {
    flow: Arc<AuthorizationCodeFlow>,
    client: Client,
}

impl ConformanceSuite {
    pub fn new(flow: Arc<AuthorizationCodeFlow>, client: Client) -> Self {
        Self { flow, client }
    }

    pub async fn run(&self) -> SuiteReport {
        let mut report = SuiteReport::default();
        for check in Check::ALL {
            report.outcomes.push(self.run_check(check).await);
        }
        tracing::info!("Conformance suite finished:\n{}", report);
        report
    }

    /// Registers a user, runs `check`, and always removes the user again.
    pub async fn run_check(&self, check: Check) -> CheckOutcome {
        let result = match self.flow.register_user().await {
            Ok(user) => {
                let result = self.execute(check, user.account()).await;
                let teardown = self.flow.remove_user(user).await;
                result.and(teardown)
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!("Check {} passed", check.as_str());
                CheckOutcome {
                    check,
                    passed: true,
                    detail: None,
                }
            }
            Err(e) => {
                tracing::warn!("Check {} failed: {}", check.as_str(), e);
                CheckOutcome {
                    check,
                    passed: false,
                    detail: Some(e.to_string()),
                }
            }
        }
    }

    async fn execute(&self, check: Check, user: &UserAccount) -> Result<(), ConformanceError> {
        match check {
            Check::ScopeSubsets => self.scope_subsets(user).await,
            Check::TokenScopes => self.token_scopes(user).await,
            Check::CodeSingleUse => self.code_single_use(user).await,
            Check::ConsentDenied => self.consent_denied(user).await,
            Check::InvalidScope => self.invalid_scope(user).await,
            Check::RedirectPortMismatch => {
                let redirect_uri = with_other_port(&self.client.redirect_uri)?;
                self.redirect_refused(user, &redirect_uri).await
            }
            Check::RedirectHostMismatch => {
                let redirect_uri = with_other_host(&self.client.redirect_uri)?;
                self.redirect_refused(user, &redirect_uri).await
            }
            Check::WrongCredentials => self.wrong_credentials(user).await,
        }
    }

    async fn scope_subsets(&self, user: &UserAccount) -> Result<(), ConformanceError> {
        for subset in scope_subsets(&self.client.scopes) {
            tracing::debug!("Requesting scope subset {:?}", subset);
            let options = AuthorizationOptions {
                scopes: Some(subset),
                ..Default::default()
            };
            // scope verification happens inside fetch_authorization_code
            self.flow
                .fetch_authorization_code(&self.client, user, &options)
                .await?;
        }
        Ok(())
    }

    async fn token_scopes(&self, user: &UserAccount) -> Result<(), ConformanceError> {
        let requested: Vec<String> = self.client.scopes.iter().take(1).cloned().collect();
        let options = AuthorizationOptions {
            scopes: Some(requested.clone()),
            ..Default::default()
        };
        let details = self
            .flow
            .fetch_authorization_code(&self.client, user, &options)
            .await?;

        match self.flow.fetch_access_token(&self.client, &details).await? {
            TokenExchange::Issued(token) => {
                verify_scopes(&requested, &token.access_token_details.scopes)
            }
            TokenExchange::Rejected(err) => Err(ConformanceError::NonConformance(format!(
                "fresh code was rejected: {err}"
            ))),
        }
    }

    async fn code_single_use(&self, user: &UserAccount) -> Result<(), ConformanceError> {
        let details = self
            .flow
            .fetch_authorization_code(&self.client, user, &AuthorizationOptions::default())
            .await?;

        if let TokenExchange::Rejected(err) =
            self.flow.fetch_access_token(&self.client, &details).await?
        {
            return Err(ConformanceError::NonConformance(format!(
                "fresh code was rejected: {err}"
            )));
        }

        match self.flow.fetch_access_token(&self.client, &details).await? {
            TokenExchange::Rejected(err) if err.is("invalid_grant") => Ok(()),
            TokenExchange::Rejected(err) => Err(ConformanceError::NonConformance(format!(
                "reused code rejected with {err}, expected invalid_grant"
            ))),
            TokenExchange::Issued(_) => Err(ConformanceError::NonConformance(
                "reused code was exchanged a second time".to_string(),
            )),
        }
    }

    async fn consent_denied(&self, user: &UserAccount) -> Result<(), ConformanceError> {
        let options = AuthorizationOptions {
            scopes: Some(self.client.scopes.clone()),
            ..Default::default()
        }
        .deny_consent();
        let terminal = self
            .flow
            .request_authorization_code(&self.client, user, &options)
            .await?;
        expect_protocol_error(&terminal, "access_denied")
    }

    async fn invalid_scope(&self, user: &UserAccount) -> Result<(), ConformanceError> {
        let options = AuthorizationOptions::default().with_scopes(&["invalid-scope"]);
        let terminal = self
            .flow
            .request_authorization_code(&self.client, user, &options)
            .await?;
        expect_protocol_error(&terminal, "invalid_scope")
    }

    async fn redirect_refused(
        &self,
        user: &UserAccount,
        redirect_uri: &str,
    ) -> Result<(), ConformanceError> {
        let client = self.client.with_redirect_uri(redirect_uri);
        let terminal = self
            .flow
            .request_authorization_code(&client, user, &AuthorizationOptions::default())
            .await?;

        if terminal.status == StatusCode::BAD_REQUEST {
            Ok(())
        } else {
            Err(ConformanceError::NonConformance(format!(
                "redirect_uri {redirect_uri} answered {} instead of 400",
                terminal.status
            )))
        }
    }

    /// Wrong credentials must be refused after the login step.
    ///
    /// A flow with the real credentials runs first, so authorize-level or
    /// transport failures fail the check instead of passing it.
    async fn wrong_credentials(&self, user: &UserAccount) -> Result<(), ConformanceError> {
        let options = AuthorizationOptions {
            scopes: Some(self.client.scopes.clone()),
            ..Default::default()
        };
        self.flow
            .fetch_authorization_code(&self.client, user, &options)
            .await?;

        let impostor = user.with_password(&gen_random_string(16)?);
        match self
            .flow
            .request_authorization_code(&self.client, &impostor, &options)
            .await
        {
            Ok(terminal) => match terminal.query_param("code") {
                Some(code) if !code.is_empty() => Err(ConformanceError::NonConformance(
                    "wrong credentials produced an authorization code".to_string(),
                )),
                _ if terminal.has_error() => Ok(()),
                _ => Err(ConformanceError::NonConformance(format!(
                    "wrong credentials ended with status {} and no error",
                    terminal.status
                ))),
            },
            Err(e) if is_login_refusal(&e) => {
                tracing::debug!("Server refused wrong credentials: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Hard failures a server may legitimately answer a failed login with.
fn is_login_refusal(err: &ConformanceError) -> bool {
    matches!(
        err,
        ConformanceError::UnexpectedStatus { .. }
            | ConformanceError::MissingRedirectTarget(_)
            | ConformanceError::InvalidRedirectTarget { .. }
            | ConformanceError::TooManyRedirects { .. }
    )
}

fn expect_protocol_error(terminal: &FlowResponse, expected: &str) -> Result<(), ConformanceError> {
    match extract_error(terminal) {
        Some(err) if err.is(expected) => Ok(()),
        Some(err) => Err(ConformanceError::NonConformance(format!(
            "expected error {expected}, got {err}"
        ))),
        None => Err(ConformanceError::NonConformance(format!(
            "expected error {expected}, got status {} without error",
            terminal.status
        ))),
    }
}

/// Non-empty subsets of `scopes`, smallest first.
fn scope_subsets(scopes: &[String]) -> Vec<Vec<String>> {
    if scopes.is_empty() {
        return Vec::new();
    }
    if scopes.len() > MAX_SUBSET_SCOPES {
        let mut subsets: Vec<Vec<String>> = scopes.iter().map(|s| vec![s.clone()]).collect();
        subsets.push(scopes.to_vec());
        return subsets;
    }

    let mut subsets: Vec<Vec<String>> = (1u32..(1 << scopes.len()))
        .map(|mask| {
            scopes
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, s)| s.clone())
                .collect()
        })
        .collect();
    subsets.sort_by_key(|s| s.len());
    subsets
}

fn parse_redirect(redirect_uri: &str) -> Result<Url, ConformanceError> {
    Url::parse(redirect_uri)
        .map_err(|e| ConformanceError::Config(format!("Invalid redirect_uri {redirect_uri}: {e}")))
}

/// Same redirect URI on a neighbouring port.
fn with_other_port(redirect_uri: &str) -> Result<String, ConformanceError> {
    let mut url = parse_redirect(redirect_uri)?;
    let port = url.port_or_known_default().unwrap_or(80);
    let other = if port == u16::MAX { 1 } else { port + 1 };
    url.set_port(Some(other)).map_err(|_| {
        ConformanceError::Config(format!("redirect_uri {redirect_uri} cannot carry a port"))
    })?;
    Ok(url.to_string())
}

fn with_other_host(redirect_uri: &str) -> Result<String, ConformanceError> {
    let mut url = parse_redirect(redirect_uri)?;
    url.set_host(Some(UNREGISTERED_HOST))
        .map_err(|e| ConformanceError::Config(e.to_string()))?;
    Ok(url.to_string())
}

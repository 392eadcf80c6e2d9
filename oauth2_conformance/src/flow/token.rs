use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use url::Url;

use crate::config::O2C_HTTP_TIMEOUT;
use crate::utils::split_scopes;

use super::errors::ConformanceError;
use super::types::{
    AccessTokenDetails, AccessTokenResponse, AuthorizationCodeDetails, Client, ProtocolError,
    TokenExchange,
};

/// Exchanges an authorization code for an access token.
///
/// Implementations return [`TokenExchange::Rejected`] when the server
/// answers with a protocol error, so callers can assert on the error code.
#[async_trait]
pub trait AccessTokenFetcher: Send + Sync {
    async fn fetch_access_token(
        &self,
        client: &Client,
        details: &AuthorizationCodeDetails,
    ) -> Result<TokenExchange, ConformanceError>;
}

#[derive(Debug, Deserialize)]
struct TokenEndpointBody {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    refresh_token: Option<String>,
}

/// Token exchange for the `authorization_code` grant.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeTokenFetcher {
    token_endpoint: Url,
    http: reqwest::Client,
}

impl AuthorizationCodeTokenFetcher {
    pub fn new(token_endpoint: Url) -> Result<Self, ConformanceError> {
        let http = reqwest::Client::builder()
            .timeout(*O2C_HTTP_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            token_endpoint,
            http,
        })
    }
}

#[async_trait]
impl AccessTokenFetcher for AuthorizationCodeTokenFetcher {
    async fn fetch_access_token(
        &self,
        client: &Client,
        details: &AuthorizationCodeDetails,
    ) -> Result<TokenExchange, ConformanceError> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", details.authorization_code.clone()),
            ("redirect_uri", client.redirect_uri.clone()),
            ("client_id", client.client_id.clone()),
        ];
        if let Some(secret) = &client.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        tracing::debug!("Exchanging code at {}", self.token_endpoint);
        let response = self
            .http
            .post(self.token_endpoint.clone())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("Token endpoint answered {}: {}", status, body);

        parse_token_response(&self.token_endpoint, status, &body, &details.scopes)
    }
}

fn parse_token_response(
    url: &Url,
    status: http::StatusCode,
    body: &str,
    requested_scopes: &[String],
) -> Result<TokenExchange, ConformanceError> {
    if !status.is_success() {
        return match serde_json::from_str::<ProtocolError>(body) {
            Ok(err) => {
                tracing::info!("Token exchange rejected: {}", err);
                Ok(TokenExchange::Rejected(err))
            }
            Err(_) => Err(ConformanceError::UnexpectedStatus {
                url: url.clone(),
                status,
            }),
        };
    }

    let parsed: TokenEndpointBody =
        serde_json::from_str(body).map_err(|e| ConformanceError::Serde(e.to_string()))?;

    let access_token = parsed
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or(ConformanceError::MissingAccessToken)?;

    let scopes = match parsed.scope {
        Some(scope) => split_scopes(&scope),
        None => requested_scopes.to_vec(),
    };

    Ok(TokenExchange::Issued(AccessTokenResponse {
        access_token_details: AccessTokenDetails {
            access_token,
            token_type: parsed.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: parsed.expires_in,
            scopes,
            refresh_token: parsed.refresh_token,
            issued_at: Utc::now(),
        },
    }))
}

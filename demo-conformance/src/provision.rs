//! Pre-provisioned account and client of a live server
//!
//! A live server usually offers no registration API to the suite, so the
//! account and client are created by hand and described via environment.

use async_trait::async_trait;
use std::env;

use oauth2_conformance::{AccountDirectory, Client, ClientRegistry, ConformanceError, UserAccount};

fn required(name: &str) -> Result<String, ConformanceError> {
    env::var(name).map_err(|_| ConformanceError::Config(format!("{name} must be set")))
}

/// Hands out the single account named by `O2C_USERNAME` / `O2C_PASSWORD`.
pub(crate) struct EnvAccounts {
    account: UserAccount,
}

impl EnvAccounts {
    pub(crate) fn from_env() -> Result<Self, ConformanceError> {
        Ok(Self {
            account: UserAccount::new(&required("O2C_USERNAME")?, &required("O2C_PASSWORD")?),
        })
    }
}

#[async_trait]
impl AccountDirectory for EnvAccounts {
    async fn generate_account(&self) -> Result<UserAccount, ConformanceError> {
        Ok(self.account.clone())
    }

    async fn register_account(&self, user: &UserAccount) -> Result<(), ConformanceError> {
        tracing::debug!("Using pre-provisioned account {}", user.username);
        Ok(())
    }

    async fn remove_account(&self, username: &str) -> Result<(), ConformanceError> {
        tracing::debug!("Keeping pre-provisioned account {}", username);
        Ok(())
    }
}

/// Describes the client registered out of band.
pub(crate) struct EnvClients {
    client: Client,
}

impl EnvClients {
    pub(crate) fn from_env(scopes: &[String]) -> Result<Self, ConformanceError> {
        let scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();
        let mut client = Client::new(
            &required("O2C_CLIENT_ID")?,
            &required("O2C_REDIRECT_URI")?,
            &scopes,
        );
        if let Ok(secret) = env::var("O2C_CLIENT_SECRET") {
            client = client.with_secret(&secret);
        }
        Ok(Self { client })
    }
}

#[async_trait]
impl ClientRegistry for EnvClients {
    async fn generate_client(
        &self,
        name: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<Client, ConformanceError> {
        if redirect_uri != self.client.redirect_uri {
            tracing::warn!(
                "Client {} asked for {}, using registered {}",
                name,
                redirect_uri,
                self.client.redirect_uri
            );
        }
        Ok(Client {
            scopes: scopes.to_vec(),
            ..self.client.clone()
        })
    }

    async fn remove_client(&self, name: &str) -> Result<(), ConformanceError> {
        tracing::debug!("Keeping pre-provisioned client {}", name);
        Ok(())
    }
}

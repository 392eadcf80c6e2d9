use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use oauth2_conformance::{
    AccountDirectory, AuthorizationCodeFlow, AuthorizationCodeTokenFetcher, Client,
    ClientRegistry, ConformanceError, ConsentStrategy, FlowCapabilities, FlowResponse,
    FormConsentStrategy, FormLoginStrategy, ServerProperties, Session, UserAccount,
    gen_random_string,
};

use url::Url;

use super::mock_server::{MockServer, MockServerState};

pub const REDIRECT_URI: &str = "https://an-awesome-service.com/";

/// Initialize tracing for tests once
pub fn init_test_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Account directory writing straight into the mock server's user table
pub struct MockAccounts {
    pub state: MockServerState,
}

#[async_trait]
impl AccountDirectory for MockAccounts {
    async fn generate_account(&self) -> Result<UserAccount, ConformanceError> {
        Ok(UserAccount::new(
            &format!("user-{}", gen_random_string(8)?),
            &gen_random_string(16)?,
        ))
    }

    async fn register_account(&self, user: &UserAccount) -> Result<(), ConformanceError> {
        self.state.add_user(&user.username, &user.password);
        Ok(())
    }

    async fn remove_account(&self, username: &str) -> Result<(), ConformanceError> {
        self.state.remove_user(username);
        Ok(())
    }
}

/// Client registry writing straight into the mock server's client table
pub struct MockClients {
    pub state: MockServerState,
}

#[async_trait]
impl ClientRegistry for MockClients {
    async fn generate_client(
        &self,
        name: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<Client, ConformanceError> {
        self.state.add_client(name, redirect_uri, scopes);
        Ok(Client {
            client_id: name.to_string(),
            client_secret: None,
            redirect_uri: redirect_uri.to_string(),
            scopes: scopes.to_vec(),
        })
    }

    async fn remove_client(&self, name: &str) -> Result<(), ConformanceError> {
        self.state.remove_client(name);
        Ok(())
    }
}

/// Consent strategy that counts how often it was asked
#[derive(Default)]
pub struct RecordingConsent {
    inner: FormConsentStrategy,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ConsentStrategy for RecordingConsent {
    async fn consent(
        &self,
        should_consent: bool,
        consent_response: &FlowResponse,
        user: &UserAccount,
        session: &Session,
        requested_scopes: &[String],
    ) -> Result<FlowResponse, ConformanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .consent(
                should_consent,
                consent_response,
                user,
                session,
                requested_scopes,
            )
            .await
    }
}

/// Everything a flow test needs, wired against one mock server
pub struct TestContext {
    pub server: MockServer,
    pub flow: Arc<AuthorizationCodeFlow>,
    pub consent: Arc<RecordingConsent>,
}

impl TestContext {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let (authorization_endpoint, token_endpoint) =
            (server.authorization_endpoint(), server.token_endpoint());
        Self::wire(server, authorization_endpoint, token_endpoint)
    }

    /// Accounts and clients live on the mock server, but every flow request
    /// goes to a port nothing listens on
    pub async fn start_unreachable() -> Self {
        let server = MockServer::start().await;
        let dead = Url::parse("http://127.0.0.1:1/").expect("Invalid dead url");
        Self::wire(
            server,
            dead.join("/oauth/authorize").expect("Invalid path"),
            dead.join("/oauth/token").expect("Invalid path"),
        )
    }

    fn wire(server: MockServer, authorization_endpoint: Url, token_endpoint: Url) -> Self {
        init_test_tracing();
        let consent = Arc::new(RecordingConsent::default());

        let capabilities = FlowCapabilities {
            login: Arc::new(FormLoginStrategy::default()),
            consent: consent.clone(),
            accounts: Arc::new(MockAccounts {
                state: server.state.clone(),
            }),
            clients: Arc::new(MockClients {
                state: server.state.clone(),
            }),
        };
        let properties = ServerProperties::new(
            authorization_endpoint,
            token_endpoint.clone(),
            vec!["read".to_string(), "write".to_string()],
        );
        let fetcher = AuthorizationCodeTokenFetcher::new(token_endpoint)
            .expect("Failed to build token fetcher");

        let flow = AuthorizationCodeFlow::new(capabilities, Arc::new(properties), Arc::new(fetcher));

        Self {
            server,
            flow: Arc::new(flow),
            consent,
        }
    }

    /// Registers the standard read/write client
    pub async fn client(&self) -> Client {
        self.flow
            .register_client(
                "an-awesome-service",
                REDIRECT_URI,
                &["read".to_string(), "write".to_string()],
            )
            .await
            .expect("Failed to register client")
    }

    pub fn consent_calls(&self) -> usize {
        self.consent.calls.load(Ordering::SeqCst)
    }
}

pub fn alice() -> UserAccount {
    UserAccount::new("alice", "correct horse battery staple")
}

use std::sync::Arc;

use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oauth2_conformance::{
    AuthorizationCodeFlow, AuthorizationCodeTokenFetcher, ConformanceSuite, FlowCapabilities,
    FormConsentStrategy, FormLoginStrategy, OAuthProperties, ServerProperties,
};

mod provision;

use crate::provision::{EnvAccounts, EnvClients};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,oauth2_conformance=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let properties = ServerProperties::from_env()?;
    let scopes = properties.available_scopes();
    let clients = Arc::new(EnvClients::from_env(&scopes)?);

    let capabilities = FlowCapabilities {
        login: Arc::new(FormLoginStrategy::default()),
        consent: Arc::new(FormConsentStrategy::default()),
        accounts: Arc::new(EnvAccounts::from_env()?),
        clients,
    };
    let fetcher = AuthorizationCodeTokenFetcher::new(properties.token_endpoint())?;
    let flow = Arc::new(AuthorizationCodeFlow::new(
        capabilities,
        Arc::new(properties),
        Arc::new(fetcher),
    ));

    let redirect_uri = std::env::var("O2C_REDIRECT_URI")?;
    let client = flow
        .register_client("demo-conformance", &redirect_uri, &scopes)
        .await?;
    tracing::info!(
        "Running conformance suite as client {} against {}",
        client.client_id,
        flow.properties().authorization_endpoint()
    );

    let report = ConformanceSuite::new(flow.clone(), client).run().await;
    println!("{report}");

    if !report.passed() {
        return Err(format!("{} check(s) failed", report.failures().count()).into());
    }
    Ok(())
}

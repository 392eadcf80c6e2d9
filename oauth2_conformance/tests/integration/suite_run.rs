use crate::common::{REDIRECT_URI, TestContext};
use oauth2_conformance::{Check, Client, ConformanceSuite};

#[tokio::test]
async fn test_suite_passes_against_conforming_server() {
    let ctx = TestContext::start().await;
    let client = ctx.client().await;

    let suite = ConformanceSuite::new(ctx.flow.clone(), client);
    let report = suite.run().await;

    println!("{report}");
    assert!(report.passed(), "unexpected failures:\n{report}");
    assert_eq!(report.outcomes.len(), Check::ALL.len());
    // every check tears its user down again
    assert_eq!(ctx.flow.sessions().is_empty(), Ok(true));
    assert!(ctx.server.state.users.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_suite_reports_ungranted_scope() {
    let ctx = TestContext::start().await;
    ctx.client().await;
    // claims a scope the server never registered for this client
    let client = Client::new("an-awesome-service", REDIRECT_URI, &["read", "admin"]);

    let suite = ConformanceSuite::new(ctx.flow.clone(), client);
    let outcome = suite.run_check(Check::ScopeSubsets).await;

    assert!(!outcome.passed);
    assert!(
        outcome
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("authorization code")),
        "detail: {:?}",
        outcome.detail
    );
    assert_eq!(ctx.flow.sessions().is_empty(), Ok(true));
}

#[tokio::test]
async fn test_unreachable_server_fails_every_check() {
    let ctx = TestContext::start_unreachable().await;
    let client = ctx.client().await;

    let suite = ConformanceSuite::new(ctx.flow.clone(), client);
    let report = suite.run().await;

    assert_eq!(report.failures().count(), Check::ALL.len(), "{report}");
    let wrong_credentials = report
        .outcome(Check::WrongCredentials)
        .expect("WrongCredentials outcome");
    assert!(!wrong_credentials.passed);
    assert!(
        wrong_credentials
            .detail
            .as_deref()
            .is_some_and(|d| d.starts_with("Http error")),
        "detail: {:?}",
        wrong_credentials.detail
    );
    assert_eq!(ctx.flow.sessions().is_empty(), Ok(true));
}

#[tokio::test]
async fn test_wrong_credentials_check_needs_a_working_authorize() {
    let ctx = TestContext::start().await;
    // never registered on the server, so authorize answers 400
    let client = Client::new("unknown-client", REDIRECT_URI, &["read"]);

    let suite = ConformanceSuite::new(ctx.flow.clone(), client);
    let outcome = suite.run_check(Check::WrongCredentials).await;

    assert!(!outcome.passed);
    assert_eq!(ctx.consent_calls(), 0);
}

#[tokio::test]
async fn test_suite_reports_narrowed_grant() {
    let ctx = TestContext::start().await;
    let client = ctx.client().await;
    ctx.server.state.narrow_grants_to(&["read"]);

    let suite = ConformanceSuite::new(ctx.flow.clone(), client);
    let outcome = suite.run_check(Check::ScopeSubsets).await;

    assert!(!outcome.passed);
    assert!(
        outcome
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("write")),
        "detail: {:?}",
        outcome.detail
    );
}

use crate::common::{REDIRECT_URI, TestContext};
use http::StatusCode;
use oauth2_conformance::{
    AuthorizationOptions, Client, ConformanceError, extract_authorization_code, extract_error,
};

#[tokio::test]
async fn test_consent_denied_yields_access_denied() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = TestContext::start().await;
    let client = ctx.client().await;
    let user = ctx.flow.register_user().await?;

    let terminal = ctx
        .flow
        .request_authorization_code(
            &client,
            user.account(),
            &AuthorizationOptions::default()
                .with_scopes(&["read"])
                .deny_consent(),
        )
        .await?;

    let err = extract_error(&terminal).expect("terminal response should carry an error");
    assert!(err.is("access_denied"), "got {err}");
    assert!(matches!(
        extract_authorization_code(&terminal),
        Err(ConformanceError::MissingAuthorizationCode)
    ));
    assert_eq!(ctx.consent_calls(), 1);

    ctx.flow.remove_user(user).await?;
    Ok(())
}

#[tokio::test]
async fn test_unknown_scope_yields_invalid_scope() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = TestContext::start().await;
    let client = ctx.client().await;
    let user = ctx.flow.register_user().await?;

    let terminal = ctx
        .flow
        .request_authorization_code(
            &client,
            user.account(),
            &AuthorizationOptions::default().with_scopes(&["invalid-scope"]),
        )
        .await?;

    assert_eq!(terminal.status, StatusCode::FOUND);
    let err = extract_error(&terminal).expect("terminal response should carry an error");
    assert!(err.is("invalid_scope"), "got {err}");
    assert_eq!(ctx.consent_calls(), 0);

    ctx.flow.remove_user(user).await?;
    Ok(())
}

/// Login failure must short-circuit before the consent step
#[tokio::test]
async fn test_wrong_credentials_never_reach_consent() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = TestContext::start().await;
    let client = ctx.client().await;
    let user = ctx.flow.register_user().await?;
    let impostor = user.account().with_password("definitely-wrong");

    let terminal = ctx
        .flow
        .request_authorization_code(&client, &impostor, &AuthorizationOptions::default())
        .await?;

    assert!(terminal.has_error());
    assert!(terminal.query_param("code").is_none());
    assert_eq!(ctx.consent_calls(), 0);
    assert_eq!(ctx.server.state.consent_pages_served(), 0);

    let result = ctx
        .flow
        .fetch_authorization_code(&client, &impostor, &AuthorizationOptions::default())
        .await;
    assert!(matches!(
        result,
        Err(ConformanceError::MissingAuthorizationCode)
    ));

    ctx.flow.remove_user(user).await?;
    Ok(())
}

#[tokio::test]
async fn test_redirect_uri_port_mismatch_is_bad_request() -> Result<(), Box<dyn std::error::Error>>
{
    let ctx = TestContext::start().await;
    let client = ctx.client().await;
    let user = ctx.flow.register_user().await?;

    let mismatched = client.with_redirect_uri("https://an-awesome-service.com:8443/");
    let terminal = ctx
        .flow
        .request_authorization_code(&mismatched, user.account(), &AuthorizationOptions::default())
        .await?;

    assert_eq!(terminal.status, StatusCode::BAD_REQUEST);
    assert!(!terminal.is_redirect());
    assert_eq!(ctx.consent_calls(), 0);

    ctx.flow.remove_user(user).await?;
    Ok(())
}

#[tokio::test]
async fn test_redirect_uri_unregistered_host_is_bad_request()
-> Result<(), Box<dyn std::error::Error>> {
    let ctx = TestContext::start().await;
    let client = ctx.client().await;
    let user = ctx.flow.register_user().await?;

    let mismatched = client.with_redirect_uri("https://evil.example.com/");
    let terminal = ctx
        .flow
        .request_authorization_code(&mismatched, user.account(), &AuthorizationOptions::default())
        .await?;

    assert_eq!(terminal.status, StatusCode::BAD_REQUEST);

    ctx.flow.remove_user(user).await?;
    Ok(())
}

#[tokio::test]
async fn test_extra_params_override_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = TestContext::start().await;
    let client = ctx.client().await;
    let user = ctx.flow.register_user().await?;

    let terminal = ctx
        .flow
        .request_authorization_code(
            &client,
            user.account(),
            &AuthorizationOptions::default().with_extra_param("response_type", "token"),
        )
        .await?;

    let err = extract_error(&terminal).expect("terminal response should carry an error");
    assert!(err.is("unsupported_response_type"), "got {err}");

    // a malformed redirect_uri override is refused outright
    let terminal = ctx
        .flow
        .request_authorization_code(
            &client,
            user.account(),
            &AuthorizationOptions::default().with_extra_param("redirect_uri", "not a uri"),
        )
        .await?;
    assert_eq!(terminal.status, StatusCode::BAD_REQUEST);

    ctx.flow.remove_user(user).await?;
    Ok(())
}

#[tokio::test]
async fn test_unknown_client_is_bad_request() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = TestContext::start().await;
    let user = ctx.flow.register_user().await?;
    let unknown = Client::new("nobody-registered-me", REDIRECT_URI, &["read"]);

    let terminal = ctx
        .flow
        .request_authorization_code(&unknown, user.account(), &AuthorizationOptions::default())
        .await?;
    assert_eq!(terminal.status, StatusCode::BAD_REQUEST);

    ctx.flow.remove_user(user).await?;
    Ok(())
}

#[tokio::test]
async fn test_narrowed_grant_is_scope_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = TestContext::start().await;
    let client = ctx.client().await;
    let user = ctx.flow.register_user().await?;
    ctx.server.state.narrow_grants_to(&["read"]);

    let result = ctx
        .flow
        .fetch_authorization_code(
            &client,
            user.account(),
            &AuthorizationOptions::default().with_scopes(&["read", "write"]),
        )
        .await;
    match result {
        Err(ConformanceError::ScopeMismatch { missing }) => {
            assert_eq!(missing, vec!["write".to_string()]);
        }
        other => panic!("Expected ScopeMismatch, got {other:?}"),
    }

    // a request within the narrowed grant still passes
    let details = ctx
        .flow
        .fetch_authorization_code(
            &client,
            user.account(),
            &AuthorizationOptions::default().with_scopes(&["read"]),
        )
        .await?;
    assert_eq!(details.scopes, vec!["read".to_string()]);

    ctx.flow.remove_user(user).await?;
    Ok(())
}

use std::collections::BTreeMap;

use crate::common::{TestContext, init_test_tracing, mock_server::MockServer};
use http::{HeaderMap, HeaderValue, StatusCode, header::LOCATION};
use oauth2_conformance::{
    ConformanceError, FlowResponse, SessionConfig, SessionStore, follow_redirect,
};

fn redirect_from(server: &MockServer, location: &str) -> FlowResponse {
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, HeaderValue::from_str(location).expect("header"));
    FlowResponse::from_parts(server.url("/start"), StatusCode::FOUND, headers, String::new())
        .expect("response")
}

#[tokio::test]
async fn test_redirect_loop_hits_hop_ceiling() {
    init_test_tracing();
    let server = MockServer::start().await;
    let store = SessionStore::new(SessionConfig {
        max_redirect_hops: 3,
        ..Default::default()
    });
    let session = store.create("looper").expect("session");

    let mut response = redirect_from(&server, "/loop");
    for _ in 0..3 {
        response = follow_redirect(&response, &session)
            .await
            .expect("hop within ceiling");
        assert_eq!(response.status, StatusCode::FOUND);
    }

    match follow_redirect(&response, &session).await {
        Err(ConformanceError::TooManyRedirects { limit }) => assert_eq!(limit, 3),
        other => panic!("Expected TooManyRedirects, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unexpected_status_is_hard_failure() {
    init_test_tracing();
    let server = MockServer::start().await;
    let store = SessionStore::default();
    let session = store.create("teapot").expect("session");

    match follow_redirect(&redirect_from(&server, "/teapot"), &session).await {
        Err(ConformanceError::UnexpectedStatus { status, url }) => {
            assert_eq!(status, StatusCode::IM_A_TEAPOT);
            assert_eq!(url.path(), "/teapot");
        }
        other => panic!("Expected UnexpectedStatus, got {other:?}"),
    }
}

/// The mock server answers authorize with a relative `Location: /login`
#[tokio::test]
async fn test_relative_target_resolves_to_previous_origin() -> Result<(), Box<dyn std::error::Error>>
{
    let ctx = TestContext::start().await;
    let client = ctx.client().await;
    let user = ctx.flow.register_user().await?;
    let session = user.session().expect("session");

    let response = ctx
        .flow
        .send_authorize_request(&session, &client, &[], &BTreeMap::new())
        .await?;

    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location, Some(ctx.server.url("/login")));

    let login_page = follow_redirect(&response, &session).await?;
    assert_eq!(login_page.status, StatusCode::OK);
    assert!(login_page.body.contains("<form"));

    ctx.flow.remove_user(user).await?;
    Ok(())
}

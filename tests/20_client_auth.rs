mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

use pocketledger_gateway::client::store::CredentialStore;
use pocketledger_gateway::client::{ApiClient, ClientError};

fn store_for(name: &str) -> CredentialStore {
    CredentialStore::at(common::temp_dir(name).join("credentials.json"))
}

fn client_for(upstream: &common::StubUpstream, store: &CredentialStore) -> ApiClient {
    ApiClient::new(upstream.base_url(), store.clone()).unwrap()
}

#[tokio::test]
async fn bearer_token_is_attached_exactly_once() -> Result<()> {
    let upstream = common::StubUpstream::spawn().await;
    let store = store_for("bearer-once");
    store.save("tok-1", "ref-1")?;
    let client = client_for(&upstream, &store);

    let res = client.request(Method::GET, "/api/profile/", None).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let requests = upstream.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].header_values("authorization"),
        vec!["Bearer tok-1"]
    );
    Ok(())
}

#[tokio::test]
async fn first_401_triggers_one_refresh_and_one_retry() -> Result<()> {
    let upstream = common::StubUpstream::spawn().await;
    upstream.push_response(401, json!({ "detail": "expired" })).await;
    upstream.push_response(200, json!({ "access": "fresh" })).await;
    upstream.push_response(200, json!({ "ok": true })).await;

    let store = store_for("refresh-retry");
    store.save("stale", "ref-1")?;
    let client = client_for(&upstream, &store);

    let res = client.request(Method::GET, "/api/budgets/", None).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let requests = upstream.requests().await;
    assert_eq!(requests.len(), 3);

    // Original request with the stale token
    assert_eq!(requests[0].path_and_query, "/api/budgets/");
    assert_eq!(
        requests[0].header_values("authorization"),
        vec!["Bearer stale"]
    );

    // Exactly one refresh exchange, carrying the refresh token in the body
    // and no bearer credential
    assert_eq!(requests[1].path_and_query, "/api/token/refresh/");
    assert_eq!(requests[1].body_json(), json!({ "refresh": "ref-1" }));
    assert!(requests[1].header("authorization").is_none());

    // Exactly one retry with the new token
    assert_eq!(requests[2].path_and_query, "/api/budgets/");
    assert_eq!(
        requests[2].header_values("authorization"),
        vec!["Bearer fresh"]
    );

    // The new access token was persisted, the refresh token kept
    let credentials = store.credentials()?;
    assert_eq!(credentials.access.as_deref(), Some("fresh"));
    assert_eq!(credentials.refresh.as_deref(), Some("ref-1"));
    Ok(())
}

#[tokio::test]
async fn second_401_after_retry_is_propagated() -> Result<()> {
    let upstream = common::StubUpstream::spawn().await;
    upstream.push_response(401, json!({ "detail": "expired" })).await;
    upstream.push_response(200, json!({ "access": "fresh" })).await;
    upstream.push_response(401, json!({ "detail": "still expired" })).await;

    let store = store_for("second-401");
    store.save("stale", "ref-1")?;
    let client = client_for(&upstream, &store);

    let res = client.request(Method::GET, "/api/budgets/", None).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // No further refresh or retry after the second failure
    assert_eq!(upstream.requests().await.len(), 3);
    Ok(())
}

#[tokio::test]
async fn failed_refresh_clears_credentials_and_reports_expired_session() -> Result<()> {
    let upstream = common::StubUpstream::spawn().await;
    upstream.push_response(401, json!({ "detail": "expired" })).await;
    upstream
        .push_response(401, json!({ "detail": "refresh token invalid" }))
        .await;

    let store = store_for("refresh-fails");
    store.save("stale", "ref-1")?;
    let client = client_for(&upstream, &store);

    let err = client
        .request(Method::GET, "/api/budgets/", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));

    // Both credentials cleared together
    let credentials = store.credentials()?;
    assert!(credentials.access.is_none());
    assert!(credentials.refresh.is_none());

    assert_eq!(upstream.requests().await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn missing_refresh_token_skips_the_exchange_and_clears_credentials() -> Result<()> {
    let upstream = common::StubUpstream::spawn().await;
    upstream.push_response(401, json!({ "detail": "expired" })).await;

    let store = store_for("no-refresh-token");
    // Access token only; no refresh token stored
    store.save_access("tok-1")?;
    let client = client_for(&upstream, &store);

    let res = client.request(Method::GET, "/api/budgets/", None).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // No refresh call went out
    assert_eq!(upstream.requests().await.len(), 1);
    assert!(store.credentials()?.access.is_none());
    Ok(())
}

#[tokio::test]
async fn login_persists_both_credentials() -> Result<()> {
    let upstream = common::StubUpstream::spawn().await;
    upstream
        .push_response(200, json!({ "access": "acc-1", "refresh": "ref-1" }))
        .await;

    let store = store_for("login");
    let client = client_for(&upstream, &store);

    client.login("casey", "hunter2").await?;

    let requests = upstream.requests().await;
    assert_eq!(requests[0].path_and_query, "/api/token/");
    assert_eq!(
        requests[0].body_json(),
        json!({ "username": "casey", "password": "hunter2" })
    );

    let credentials = store.credentials()?;
    assert_eq!(credentials.access.as_deref(), Some("acc-1"));
    assert_eq!(credentials.refresh.as_deref(), Some("ref-1"));
    Ok(())
}

#[tokio::test]
async fn non_401_errors_propagate_unchanged() -> Result<()> {
    let upstream = common::StubUpstream::spawn().await;
    upstream
        .push_response(404, json!({ "detail": "not found" }))
        .await;

    let store = store_for("plain-error");
    store.save("tok-1", "ref-1")?;
    let client = client_for(&upstream, &store);

    let res = client.request(Method::GET, "/api/budgets/99/", None).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // No refresh was attempted and the credentials are untouched
    assert_eq!(upstream.requests().await.len(), 1);
    assert_eq!(store.credentials()?.access.as_deref(), Some("tok-1"));
    Ok(())
}

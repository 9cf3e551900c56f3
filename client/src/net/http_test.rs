use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use tokio::sync::Notify;

use super::*;
use crate::net::test_support::{MockTransport, backend, bearer, path_of, respond, respond_json, wait_until};
use crate::state::token_store::SessionEvent;

const BASE: &str = "http://api.test/api";

fn client(transport: Arc<MockTransport>, store: Arc<TokenStore>) -> ApiClient {
    ApiClient::with_transport(BASE, transport, store)
}

fn session(access: &str, refresh: &str) -> Arc<TokenStore> {
    let store = Arc::new(TokenStore::in_memory());
    store.set_tokens(access, refresh);
    store
}

// =============================================================================
// url + headers
// =============================================================================

#[test]
fn join_url_uses_single_slash() {
    assert_eq!(join_url("http://h/api/", "/posts/"), "http://h/api/posts/");
    assert_eq!(join_url("http://h/api", "posts/"), "http://h/api/posts/");
}

#[test]
fn build_url_encodes_query() {
    let url = build_url("http://h/api", "/posts/", &[("search".into(), "rust & tokio".into())]).unwrap();
    assert_eq!(url, "http://h/api/posts/?search=rust+%26+tokio");
}

#[tokio::test]
async fn attaches_bearer_and_json_headers() {
    let transport = Arc::new(backend("T1"));
    let api = client(transport.clone(), session("T1", "R1"));

    let body: Value = api.post("/posts/", &json!({ "title": "x" })).await.unwrap();
    assert_eq!(body, json!({ "ok": true }));

    let sent = &transport.requests()[0];
    assert_eq!(sent.url, "http://api.test/api/posts/");
    assert_eq!(bearer(sent), Some("T1"));
    assert_eq!(sent.header("content-type"), Some("application/json"));
    assert_eq!(sent.body.as_deref(), Some(r#"{"title":"x"}"#));
}

#[tokio::test]
async fn anonymous_request_has_no_authorization_header() {
    let transport = Arc::new(MockTransport::new(|_| respond(200, "[]")));
    let api = client(transport.clone(), Arc::new(TokenStore::in_memory()));

    let _: Vec<Value> = api.get("/categories/").await.unwrap();
    assert!(transport.requests()[0].header("Authorization").is_none());
}

#[tokio::test]
async fn non_auth_errors_pass_through() {
    let transport = Arc::new(MockTransport::new(|_| respond(404, r#"{"detail":"Not found."}"#)));
    let api = client(transport.clone(), session("T1", "R1"));

    let err = api.get::<Value>("/posts/missing/").await.unwrap_err();
    assert_eq!(err, ApiError::NotFound("Not found.".into()));
    assert_eq!(transport.refresh_calls(), 0);
}

#[tokio::test]
async fn undecodable_body_is_decode_error() {
    let transport = Arc::new(MockTransport::new(|_| respond(200, "<html>")));
    let api = client(transport, session("T1", "R1"));
    assert!(matches!(api.get::<Value>("/posts/").await, Err(ApiError::Decode(_))));
}

// =============================================================================
// refresh on 401
// =============================================================================

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let transport = Arc::new(backend("T2"));
    let store = session("T1", "R1");
    let mut events = store.subscribe_events();
    let api = client(transport.clone(), store.clone());

    let body: Value = api.get("/posts/my-posts/").await.unwrap();
    assert_eq!(body, json!({ "ok": true }));

    let sent = transport.requests();
    assert_eq!(sent.len(), 3);
    assert_eq!(bearer(&sent[0]), Some("T1"));
    assert!(path_of(&sent[1]).ends_with("/auth/refresh/"));
    assert_eq!(sent[1].body.as_deref(), Some(r#"{"refresh":"R1"}"#));
    assert_eq!(bearer(&sent[2]), Some("T2"));

    assert_eq!(store.access_token().as_deref(), Some("T2"));
    assert_eq!(store.refresh_token().as_deref(), Some("R2"));
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Refreshed);
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    const CALLERS: usize = 5;
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(backend("T2").holding_refresh(gate.clone()));
    let api = Arc::new(client(transport.clone(), session("T1", "R1")));

    let mut handles = Vec::new();
    for i in 0..CALLERS {
        let api = api.clone();
        handles.push(tokio::spawn(async move { api.get::<Value>(&format!("/posts/p{i}/")).await }));
    }

    let coordinator_api = api.clone();
    wait_until(move || coordinator_api.refresh_coordinator().waiting() == CALLERS - 1).await;
    assert!(api.refresh_coordinator().is_refreshing());
    gate.notify_one();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), json!({ "ok": true }));
    }
    assert_eq!(transport.refresh_calls(), 1);

    let replays: Vec<_> = transport.requests().into_iter().filter(|r| bearer(r) == Some("T2")).collect();
    assert_eq!(replays.len(), CALLERS);
    assert!(!api.refresh_coordinator().is_refreshing());
}

#[tokio::test]
async fn failed_refresh_fails_every_waiter_and_clears_session() {
    const CALLERS: usize = 3;
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(
        MockTransport::new(|req| {
            if path_of(req).ends_with("/auth/refresh/") {
                respond_json(401, &json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" }))
            } else {
                respond(401, r#"{"detail":"expired"}"#)
            }
        })
        .holding_refresh(gate.clone()),
    );
    let store = session("T1", "R1");
    let mut events = store.subscribe_events();
    let api = Arc::new(client(transport.clone(), store.clone()));

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let api = api.clone();
        handles.push(tokio::spawn(async move { api.get::<Value>("/auth/user/").await }));
    }
    let waiting_api = api.clone();
    wait_until(move || waiting_api.refresh_coordinator().waiting() == CALLERS - 1).await;
    gate.notify_one();

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err, ApiError::Unauthorized("refresh token invalid or expired".into()));
    }
    assert_eq!(transport.refresh_calls(), 1);
    assert_eq!(store.snapshot(), crate::state::token_store::Session::default());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Expired);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn retried_request_401_fails_without_refresh() {
    let transport = Arc::new(backend("T2"));
    let store = session("T1", "R1");
    let api = client(transport.clone(), store.clone());

    let err = api.send(ApiRequest::get("/posts/").mark_retried()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert_eq!(transport.refresh_calls(), 0);
    assert_eq!(store.access_token().as_deref(), Some("T1"));
}

#[tokio::test]
async fn replay_rejected_again_does_not_refresh_twice() {
    let transport = Arc::new(MockTransport::new(|req| {
        if path_of(req).ends_with("/auth/refresh/") {
            respond_json(200, &json!({ "access": "T2" }))
        } else {
            respond(401, r#"{"detail":"nope"}"#)
        }
    }));
    let store = session("T1", "R1");
    let api = client(transport.clone(), store.clone());

    let err = api.get::<Value>("/posts/my-posts/").await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized("nope".into()));
    assert_eq!(transport.refresh_calls(), 1);
    assert_eq!(transport.requests().len(), 3);
    // Non-rotating refresh keeps the old refresh token.
    assert_eq!(store.refresh_token().as_deref(), Some("R1"));
}

#[tokio::test]
async fn missing_refresh_token_fails_without_refresh_call() {
    let transport = Arc::new(backend("T2"));
    let store = Arc::new(TokenStore::in_memory());
    let api = client(transport.clone(), store);

    let err = api.get::<Value>("/posts/my-posts/").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert_eq!(transport.refresh_calls(), 0);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn opted_out_request_never_refreshes() {
    let transport = Arc::new(backend("T2"));
    let api = client(transport.clone(), session("T1", "R1"));

    let err = api.send(ApiRequest::post("/auth/login/").without_refresh()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert_eq!(transport.refresh_calls(), 0);
}

#[tokio::test]
async fn stale_token_replays_without_new_refresh() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let transport = Arc::new(MockTransport::new(move |req| {
        if path_of(req).ends_with("/auth/refresh/") {
            counter.fetch_add(1, Ordering::SeqCst);
            return respond_json(200, &json!({ "access": "T3", "refresh": "R3" }));
        }
        if bearer(req) == Some("T2") { respond(200, "{}") } else { respond(401, "{}") }
    }));
    let store = session("T1", "R1");
    let api = client(transport, store.clone());

    // Another caller already refreshed to T2 after this request went out with T1.
    store.set_tokens("T2", "R2");
    let token = api.refresh_coordinator().recover(Some("T1")).await.unwrap();
    assert_eq!(token, "T2");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::net::test_support::{MockTransport, respond_json};
use crate::state::token_store::TokenStore;

#[tokio::test]
async fn create_tag_sends_name_and_slug() {
    let transport = Arc::new(MockTransport::new(|req| {
        assert_eq!(req.body.as_deref(), Some(r#"{"name":"Async Rust","slug":"async-rust"}"#));
        respond_json(201, &json!({ "id": 4, "name": "Async Rust", "slug": "async-rust" }))
    }));
    let api = ApiClient::with_transport("http://api.test/api", transport, Arc::new(TokenStore::in_memory()));

    let tag = create_tag(&api, &NewTag { name: "Async Rust".into(), slug: "async-rust".into() }).await.unwrap();
    assert_eq!(tag.id, 4);
}

#[tokio::test]
async fn list_tags_reads_paginated_results() {
    let transport = Arc::new(MockTransport::new(|_| {
        respond_json(200, &json!({ "count": 1, "next": null, "previous": null, "results": [{ "id": 1, "name": "Rust", "slug": "rust" }] }))
    }));
    let api = ApiClient::with_transport("http://api.test/api", transport, Arc::new(TokenStore::in_memory()));
    assert_eq!(list_tags(&api).await.unwrap()[0].slug, "rust");
}

use axum::http::StatusCode;
#[path = "support/mod.rs"]
mod support;

use keeper_broker::models::{ListSecretsResponse, ValueEncoding, decode_content};
use keeper_core::SecretKind;
use serde_json::json;
use support::{app, json_request, register, send, test_config};

async fn list(app: &axum::Router, bearer: &str) -> ListSecretsResponse {
    let reply = send(app, json_request("GET", "/v1/secrets", Some(bearer), None)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    serde_json::from_value(reply.body).expect("list body")
}

async fn create(app: &axum::Router, bearer: &str, body: serde_json::Value) -> i64 {
    let reply = send(app, json_request("POST", "/v1/secrets", Some(bearer), Some(body))).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["id"].as_i64().expect("id")
}

#[tokio::test]
async fn secret_lifecycle_over_http() {
    let app = app();
    let alice = register(&app, "alice", "pw").await;

    let id = create(
        &app,
        &alice,
        json!({
            "kind": "TEXT",
            "encoding": "utf8",
            "content": "hello",
            "metadata": "greeting"
        }),
    )
    .await;

    let listed = list(&app, &alice).await;
    assert_eq!(listed.items.len(), 1);
    let item = &listed.items[0];
    assert_eq!(item.id.get(), id);
    assert_eq!(item.kind, SecretKind::Text);
    assert_eq!(item.encoding, ValueEncoding::Utf8);
    assert_eq!(item.content, "hello");
    assert_eq!(item.metadata.as_deref(), Some("greeting"));

    let reply = send(
        &app,
        json_request(
            "PUT",
            &format!("/v1/secrets/{id}"),
            Some(&alice),
            Some(json!({ "kind": "BINARY", "content": "AAEC" })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT, "{}", reply.body);

    let listed = list(&app, &alice).await;
    let item = &listed.items[0];
    assert_eq!(item.kind, SecretKind::Binary);
    assert_eq!(item.encoding, ValueEncoding::Base64);
    assert_eq!(
        decode_content(item.encoding, &item.content).unwrap(),
        vec![0, 1, 2]
    );
    assert_eq!(item.metadata, None);

    let reply = send(
        &app,
        json_request("DELETE", &format!("/v1/secrets/{id}"), Some(&alice), None),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert!(list(&app, &alice).await.items.is_empty());
}

#[tokio::test]
async fn tenants_cannot_see_or_touch_each_other() {
    let app = app();
    let alice = register(&app, "alice", "pw").await;
    let bob = register(&app, "bob", "pw").await;

    let id = create(
        &app,
        &alice,
        json!({ "kind": "CREDENTIALS", "encoding": "utf8", "content": "alice:hunter2" }),
    )
    .await;

    assert!(list(&app, &bob).await.items.is_empty());

    let reply = send(
        &app,
        json_request(
            "PUT",
            &format!("/v1/secrets/{id}"),
            Some(&bob),
            Some(json!({ "kind": "TEXT", "encoding": "utf8", "content": "owned" })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "not_found");

    let reply = send(
        &app,
        json_request("DELETE", &format!("/v1/secrets/{id}"), Some(&bob), None),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let items = list(&app, &alice).await.items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "alice:hunter2");
}

#[tokio::test]
async fn missing_and_foreign_ids_are_indistinguishable() {
    let app = app();
    let alice = register(&app, "alice", "pw").await;
    let bob = register(&app, "bob", "pw").await;
    let id = create(
        &app,
        &alice,
        json!({ "kind": "TEXT", "encoding": "utf8", "content": "x" }),
    )
    .await;

    let foreign = send(
        &app,
        json_request("DELETE", &format!("/v1/secrets/{id}"), Some(&bob), None),
    )
    .await;
    let missing = send(
        &app,
        json_request("DELETE", "/v1/secrets/424242", Some(&bob), None),
    )
    .await;
    assert_eq!(foreign.status, missing.status);
    assert_eq!(foreign.body["error"], missing.body["error"]);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let app = app();
    let alice = register(&app, "alice", "pw").await;

    let reply = send(
        &app,
        json_request(
            "POST",
            "/v1/secrets",
            Some(&alice),
            Some(json!({ "kind": "OTP", "encoding": "utf8", "content": "123456" })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "bad_request");

    let reply = send(
        &app,
        json_request(
            "POST",
            "/v1/secrets",
            Some(&alice),
            Some(json!({ "kind": "TEXT", "content": "%%%" })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(
        &app,
        json_request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({ "login": "", "password": "pw" })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_keeps_creation_order() {
    let app = app();
    let alice = register(&app, "alice", "pw").await;
    for content in ["first", "second", "third"] {
        create(
            &app,
            &alice,
            json!({ "kind": "TEXT", "encoding": "utf8", "content": content }),
        )
        .await;
    }
    let contents: Vec<_> = list(&app, &alice)
        .await
        .items
        .into_iter()
        .map(|item| item.content)
        .collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn state_file_survives_restart() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let mut config = test_config();
    config.state_path = Some(dir.path().join("keeper.state"));

    let first = keeper_broker::http::router(keeper_broker::build_state(&config).unwrap());
    let alice = register(&first, "alice", "pw").await;
    create(
        &first,
        &alice,
        json!({ "kind": "CARD", "encoding": "utf8", "content": "4111 1111 1111 1111" }),
    )
    .await;
    drop(first);

    let second = keeper_broker::http::router(keeper_broker::build_state(&config).unwrap());
    let reply = send(
        &second,
        json_request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "login": "alice", "password": "pw" })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let bearer = format!("bearer {}", reply.body["token"].as_str().unwrap());

    let items = list(&second, &bearer).await.items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, SecretKind::Card);
    assert_eq!(items[0].content, "4111 1111 1111 1111");
}

#[tokio::test]
async fn state_file_holds_no_plaintext() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let path = dir.path().join("keeper.state");
    let mut config = test_config();
    config.state_path = Some(path.clone());

    let app = keeper_broker::http::router(keeper_broker::build_state(&config).unwrap());
    let alice = register(&app, "alice", "correct horse").await;
    create(
        &app,
        &alice,
        json!({
            "kind": "CREDENTIALS",
            "encoding": "utf8",
            "content": "very-distinctive-plaintext",
            "metadata": "distinctive-metadata"
        }),
    )
    .await;

    let raw = std::fs::read_to_string(&path).unwrap();
    let (_, encoded) = raw.trim().split_once('=').unwrap();
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(encoded)
        .unwrap();
    let snapshot = String::from_utf8(decoded).unwrap();
    assert!(snapshot.contains("alice"));
    assert!(!snapshot.contains("very-distinctive-plaintext"));
    assert!(!snapshot.contains("distinctive-metadata"));
    assert!(!snapshot.contains("correct horse"));
}

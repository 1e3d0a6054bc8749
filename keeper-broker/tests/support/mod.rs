#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header::AUTHORIZATION};
use keeper_broker::BrokerConfig;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const SECRET_KEY: &str = "broker-integration-secret";

pub fn test_config() -> BrokerConfig {
    BrokerConfig {
        secret_key: Some(SECRET_KEY.into()),
        ..BrokerConfig::default()
    }
}

pub fn app() -> Router {
    let state = keeper_broker::build_state(&test_config()).expect("state");
    keeper_broker::http::router(state)
}

pub struct Reply {
    pub status: StatusCode,
    pub correlation: Option<String>,
    pub body: Value,
}

pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let correlation = response
        .headers()
        .get(keeper_broker::telemetry::CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Reply {
        status,
        correlation,
        body,
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

/// Registers `login` and returns its bearer header value.
pub async fn register(app: &Router, login: &str, password: &str) -> String {
    let reply = send(
        app,
        json_request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({ "login": login, "password": password })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let token = reply.body["token"].as_str().expect("token").to_owned();
    format!("bearer {token}")
}

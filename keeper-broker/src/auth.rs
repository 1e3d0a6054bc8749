use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::{Method, Request, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use keeper_core::Operation;
use tracing::debug;

use crate::error::{AppError, attach_correlation};
use crate::state::AppState;
use crate::telemetry::CorrelationId;

pub const REGISTER_PATH: &str = "/v1/auth/register";
pub const LOGIN_PATH: &str = "/v1/auth/login";
pub const SECRETS_PATH: &str = "/v1/secrets";
pub const SECRET_PATH: &str = "/v1/secrets/{id}";

/// Maps a routed request onto the operation it invokes.
pub fn classify(method: &Method, route: &str) -> Option<Operation> {
    let operation = match (route, method.as_str()) {
        (REGISTER_PATH, "POST") => Operation::Register,
        (LOGIN_PATH, "POST") => Operation::Login,
        (SECRETS_PATH, "POST") => Operation::CreateSecret,
        (SECRETS_PATH, "GET") => Operation::ListSecrets,
        (SECRET_PATH, "PUT") => Operation::UpdateSecret,
        (SECRET_PATH, "DELETE") => Operation::DeleteSecret,
        _ => return None,
    };
    Some(operation)
}

/// Runs the request gate for every routed API call.
///
/// The operation name decides whether a token is required; a route that maps to
/// no operation is gated under its own path, which is never allow-listed.
pub async fn http_layer(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let operation = classify(req.method(), &route);
    let method_name = operation.map(Operation::name).unwrap_or(route.as_str());

    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    match state.gate.admit(method_name, authorization) {
        Ok(context) => {
            if let Some(operation) = operation {
                req.extensions_mut().insert(operation);
            }
            req.extensions_mut().insert(context);
            next.run(req).await
        }
        Err(reason) => {
            debug!(route = %route, %reason, "rejecting http call");
            let err = AppError::from(reason);
            match req.extensions().get::<CorrelationId>() {
                Some(correlation) => attach_correlation(err, correlation).into_response(),
                None => err.into_response(),
            }
        }
    }
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use keeper_core::{CallContext, SecretId};
use tracing::Instrument;

use crate::auth::{self, LOGIN_PATH, REGISTER_PATH, SECRET_PATH, SECRETS_PATH};
use crate::error::{AppError, attach_correlation};
use crate::models::{
    CreatedResponse, CredentialsRequest, ListSecretsResponse, SecretRequest, TokenResponse,
};
use crate::state::AppState;
use crate::telemetry::{CorrelationId, correlation_layer, request_span};

pub fn router(state: AppState) -> Router {
    let api = api_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::http_layer,
    ));

    Router::new()
        .route("/healthz", get(health_check))
        .merge(api)
        .layer(middleware::from_fn(correlation_layer))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(REGISTER_PATH, post(register))
        .route(LOGIN_PATH, post(login))
        .route(SECRETS_PATH, post(create_secret).get(list_secrets))
        .route(SECRET_PATH, put(update_secret).delete(delete_secret))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn register(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let span = request_span("http.register", &correlation.0);
    async move {
        let token = state.auth.register(&request.login, &request.password).await?;
        Ok((StatusCode::CREATED, Json(TokenResponse { token })))
    }
    .instrument(span)
    .await
    .map_err(|err: AppError| attach_correlation(err, &correlation))
}

async fn login(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let span = request_span("http.login", &correlation.0);
    async move {
        let token = state.auth.login(&request.login, &request.password).await?;
        Ok(Json(TokenResponse { token }))
    }
    .instrument(span)
    .await
    .map_err(|err: AppError| attach_correlation(err, &correlation))
}

async fn create_secret(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(ctx): Extension<CallContext>,
    Json(request): Json<SecretRequest>,
) -> Result<impl IntoResponse, AppError> {
    let span = request_span("http.create", &correlation.0);
    async move {
        let draft = request.into_draft()?;
        let id = state.secrets.create_secret(&ctx, draft).await?;
        Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
    }
    .instrument(span)
    .await
    .map_err(|err: AppError| attach_correlation(err, &correlation))
}

async fn list_secrets(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(ctx): Extension<CallContext>,
) -> Result<impl IntoResponse, AppError> {
    let span = request_span("http.list", &correlation.0);
    async move {
        let records = state.secrets.list_secrets(&ctx).await?;
        Ok(Json(ListSecretsResponse::from_records(records)))
    }
    .instrument(span)
    .await
    .map_err(|err: AppError| attach_correlation(err, &correlation))
}

async fn update_secret(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(ctx): Extension<CallContext>,
    Path(id): Path<i64>,
    Json(request): Json<SecretRequest>,
) -> Result<impl IntoResponse, AppError> {
    let span = request_span("http.update", &correlation.0);
    async move {
        let draft = request.into_draft()?;
        state
            .secrets
            .update_secret(&ctx, SecretId::new(id), draft)
            .await?;
        Ok(StatusCode::NO_CONTENT)
    }
    .instrument(span)
    .await
    .map_err(|err: AppError| attach_correlation(err, &correlation))
}

async fn delete_secret(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(ctx): Extension<CallContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let span = request_span("http.delete", &correlation.0);
    async move {
        state.secrets.delete_secret(&ctx, SecretId::new(id)).await?;
        Ok(StatusCode::NO_CONTENT)
    }
    .instrument(span)
    .await
    .map_err(|err: AppError| attach_correlation(err, &correlation))
}

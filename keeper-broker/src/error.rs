use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keeper_core::AuthError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::telemetry::{CORRELATION_ID_HEADER, CorrelationId, correlation_header_value};

/// Client-facing message for every authentication failure.
pub const UNAUTHENTICATED: &str = "unauthenticated";

#[derive(Debug, Error)]
pub enum AppErrorKind {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthenticated")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("request timed out, retry later")]
    Unavailable,
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
    #[error("internal error")]
    Internal,
}

#[derive(Debug, Error)]
#[error("{kind}")]
pub struct AppError {
    kind: AppErrorKind,
    correlation_id: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            correlation_id: None,
        }
    }

    pub fn with_correlation(mut self, id: String) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn kind(&self) -> &AppErrorKind {
        &self.kind
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            AppErrorKind::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            AppErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            AppErrorKind::Conflict(_) => StatusCode::CONFLICT,
            AppErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppErrorKind::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        Self::new(AppErrorKind::BadRequest(message.into()))
    }

    pub fn unauthorized() -> Self {
        Self::new(AppErrorKind::Unauthorized)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    correlation_id: Option<&'a str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let correlation = self.correlation_id.clone();
        let body = Json(ErrorBody {
            error: match &self.kind {
                AppErrorKind::BadRequest(_) => "bad_request",
                AppErrorKind::Unauthorized => UNAUTHENTICATED,
                AppErrorKind::NotFound(_) => "not_found",
                AppErrorKind::Conflict(_) => "already_exists",
                AppErrorKind::Unavailable => "unavailable",
                AppErrorKind::NotImplemented(_) => "unimplemented",
                AppErrorKind::Internal => "internal",
            },
            message: self.kind.to_string(),
            correlation_id: correlation.as_deref(),
        });

        let mut response = (status, body).into_response();
        if let Some(id) = correlation {
            response
                .headers_mut()
                .insert(CORRELATION_ID_HEADER, correlation_header_value(&id));
        }
        response
    }
}

impl From<keeper_core::Error> for AppError {
    fn from(value: keeper_core::Error) -> Self {
        use keeper_core::Error;

        let kind = match value {
            Error::Auth(_) | Error::InvalidCredentials => AppErrorKind::Unauthorized,
            Error::AlreadyExists { .. } => AppErrorKind::Conflict(value.to_string()),
            Error::NotFound { .. } => AppErrorKind::NotFound(value.to_string()),
            Error::Invalid(message) => AppErrorKind::BadRequest(message),
            Error::Timeout { .. } => AppErrorKind::Unavailable,
            Error::Unimplemented(operation) => AppErrorKind::NotImplemented(operation),
            Error::IdentityResolution
            | Error::Crypto(_)
            | Error::Storage(_)
            | Error::Internal(_) => {
                error!(error = %value, "request failed");
                AppErrorKind::Internal
            }
        };
        AppError::new(kind)
    }
}

impl From<AuthError> for AppError {
    fn from(_: AuthError) -> Self {
        AppError::unauthorized()
    }
}

pub fn attach_correlation(err: AppError, correlation: &CorrelationId) -> AppError {
    err.with_correlation(correlation.0.clone())
}

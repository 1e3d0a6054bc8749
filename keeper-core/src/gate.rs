//! Per-call authentication gate.
//!
//! Every inbound call passes through [`RequestGate::admit`] exactly once before any
//! business logic runs. Calls named in [`UNAUTHENTICATED_OPERATIONS`] pass with no
//! identity; all others must carry `"bearer <token>"` in the `authorization`
//! metadata field and leave the gate with the token's tenant bound to their
//! [`CallContext`]. The gate holds no per-call state.

use std::sync::Arc;

use tracing::debug;

use crate::credentials::CredentialManager;
use crate::errors::{AuthError, Error, Result};
use crate::types::TenantId;

/// Metadata field carrying the bearer credential.
pub const AUTHORIZATION_FIELD: &str = "authorization";
/// Required scheme, compared case-insensitively.
pub const BEARER_SCHEME: &str = "bearer";

/// Named operations of the service surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    Login,
    CreateSecret,
    ListSecrets,
    UpdateSecret,
    DeleteSecret,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Register,
        Operation::Login,
        Operation::CreateSecret,
        Operation::ListSecrets,
        Operation::UpdateSecret,
        Operation::DeleteSecret,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Operation::Register => "keeper.Auth/Register",
            Operation::Login => "keeper.Auth/Login",
            Operation::CreateSecret => "keeper.Secret/Create",
            Operation::ListSecrets => "keeper.Secret/GetSecrets",
            Operation::UpdateSecret => "keeper.Secret/Update",
            Operation::DeleteSecret => "keeper.Secret/Delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

/// Operations that bypass authentication.
pub const UNAUTHENTICATED_OPERATIONS: [&str; 2] =
    [Operation::Register.name(), Operation::Login.name()];

/// Request-scoped identity produced by the gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    tenant: Option<TenantId>,
}

impl CallContext {
    pub fn anonymous() -> Self {
        Self { tenant: None }
    }

    pub fn for_tenant(tenant: TenantId) -> Self {
        Self {
            tenant: Some(tenant),
        }
    }

    /// The bound tenant, or [`Error::IdentityResolution`] when the call was never
    /// authenticated.
    pub fn tenant(&self) -> Result<TenantId> {
        self.tenant.ok_or(Error::IdentityResolution)
    }

    pub fn is_authenticated(&self) -> bool {
        self.tenant.is_some()
    }
}

pub struct RequestGate {
    credentials: Arc<CredentialManager>,
}

impl RequestGate {
    pub fn new(credentials: Arc<CredentialManager>) -> Self {
        Self { credentials }
    }

    pub fn requires_authentication(method: &str) -> bool {
        !UNAUTHENTICATED_OPERATIONS.contains(&method)
    }

    /// Classifies, extracts, parses and validates in one pass.
    ///
    /// `authorization` is the raw value of the [`AUTHORIZATION_FIELD`] metadata
    /// field, if present.
    pub fn admit(
        &self,
        method: &str,
        authorization: Option<&str>,
    ) -> std::result::Result<CallContext, AuthError> {
        if !Self::requires_authentication(method) {
            return Ok(CallContext::anonymous());
        }

        let result = authorization
            .ok_or(AuthError::MissingToken)
            .and_then(parse_bearer)
            .and_then(|token| self.credentials.validate(token));

        match result {
            Ok(tenant) => Ok(CallContext::for_tenant(tenant)),
            Err(err) => {
                debug!(method, reason = %err, "call rejected by gate");
                Err(err)
            }
        }
    }

    /// Admits the call and, on success, runs `handler` once with the bound context.
    /// On failure `handler` is dropped without being invoked.
    pub fn intercept<T, F>(
        &self,
        method: &str,
        authorization: Option<&str>,
        handler: F,
    ) -> std::result::Result<T, AuthError>
    where
        F: FnOnce(CallContext) -> T,
    {
        self.admit(method, authorization).map(handler)
    }
}

/// Splits `"<scheme> <token>"` on the first space.
pub fn parse_bearer(value: &str) -> std::result::Result<&str, AuthError> {
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::Malformed)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(AuthError::WrongScheme);
    }
    Ok(token)
}

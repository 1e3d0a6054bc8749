//! Service surfaces exposed over the transport.
//!
//! Every method has a default body that answers with
//! [`Error::Unimplemented`], so an implementation that leaves an operation out
//! still presents the complete surface.

use async_trait::async_trait;

use crate::errors::{Error, Result};
use crate::gate::{CallContext, Operation};
use crate::types::{SecretDraft, SecretId, SecretRecord};

/// `keeper.Auth`: registration and login.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Creates a user and returns a signed token for the new identity.
    async fn register(&self, login: &str, password: &str) -> Result<String> {
        let _ = (login, password);
        Err(Error::Unimplemented(Operation::Register.name()))
    }

    /// Checks credentials and returns a signed token.
    async fn login(&self, login: &str, password: &str) -> Result<String> {
        let _ = (login, password);
        Err(Error::Unimplemented(Operation::Login.name()))
    }
}

/// `keeper.Secret`: CRUD over the caller's own secrets.
#[async_trait]
pub trait SecretApi: Send + Sync {
    async fn create_secret(&self, ctx: &CallContext, draft: SecretDraft) -> Result<SecretId> {
        let _ = (ctx, draft);
        Err(Error::Unimplemented(Operation::CreateSecret.name()))
    }

    async fn list_secrets(&self, ctx: &CallContext) -> Result<Vec<SecretRecord>> {
        let _ = ctx;
        Err(Error::Unimplemented(Operation::ListSecrets.name()))
    }

    async fn update_secret(
        &self,
        ctx: &CallContext,
        id: SecretId,
        draft: SecretDraft,
    ) -> Result<()> {
        let _ = (ctx, id, draft);
        Err(Error::Unimplemented(Operation::UpdateSecret.name()))
    }

    async fn delete_secret(&self, ctx: &CallContext, id: SecretId) -> Result<()> {
        let _ = (ctx, id);
        Err(Error::Unimplemented(Operation::DeleteSecret.name()))
    }
}

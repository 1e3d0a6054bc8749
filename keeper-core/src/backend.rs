use crate::errors::{Error, Result};
use crate::types::{EncryptedSecretRow, NewUser, SealedSecret, SecretId, TenantId, UserRecord};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub mod memory;

pub use memory::MemoryStore;

/// Deadline applied to each repository call unless configured otherwise.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs one repository call under `after`, reporting expiry as [`Error::Timeout`].
pub async fn with_timeout<T, F>(operation: &'static str, after: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(after, call)
        .await
        .map_err(|_| Error::Timeout { operation, after })?
}

/// Persistence of registered users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Store a new user and return the assigned tenant id.
    ///
    /// Fails with [`Error::AlreadyExists`](crate::Error::AlreadyExists) when the login
    /// is taken.
    async fn save_user(&self, user: NewUser) -> Result<TenantId>;

    /// Look a user up by login, failing with
    /// [`Error::NotFound`](crate::Error::NotFound) when absent.
    async fn get_user(&self, login: &str) -> Result<UserRecord>;
}

/// Persistence of encrypted secret rows.
///
/// Rows only ever hold ciphertext. Every mutating call is constrained by the
/// tenant id; a row owned by another tenant is reported exactly like a missing one.
#[async_trait]
pub trait SecretRepository: Send + Sync {
    /// Insert a row for `tenant`, stamping its id and creation time.
    async fn create_secret(&self, tenant: TenantId, sealed: SealedSecret) -> Result<SecretId>;

    /// All rows of `tenant` in creation order.
    async fn list_secrets(&self, tenant: TenantId) -> Result<Vec<EncryptedSecretRow>>;

    /// Replace kind, content and metadata of the row matching both `id` and `tenant`.
    async fn update_secret(
        &self,
        id: SecretId,
        tenant: TenantId,
        sealed: SealedSecret,
    ) -> Result<()>;

    /// Remove the row matching both `id` and `tenant`.
    async fn delete_secret(&self, id: SecretId, tenant: TenantId) -> Result<()>;
}

#[async_trait]
impl<T> UserRepository for Arc<T>
where
    T: UserRepository + ?Sized,
{
    async fn save_user(&self, user: NewUser) -> Result<TenantId> {
        (**self).save_user(user).await
    }

    async fn get_user(&self, login: &str) -> Result<UserRecord> {
        (**self).get_user(login).await
    }
}

#[async_trait]
impl<T> SecretRepository for Arc<T>
where
    T: SecretRepository + ?Sized,
{
    async fn create_secret(&self, tenant: TenantId, sealed: SealedSecret) -> Result<SecretId> {
        (**self).create_secret(tenant, sealed).await
    }

    async fn list_secrets(&self, tenant: TenantId) -> Result<Vec<EncryptedSecretRow>> {
        (**self).list_secrets(tenant).await
    }

    async fn update_secret(
        &self,
        id: SecretId,
        tenant: TenantId,
        sealed: SealedSecret,
    ) -> Result<()> {
        (**self).update_secret(id, tenant, sealed).await
    }

    async fn delete_secret(&self, id: SecretId, tenant: TenantId) -> Result<()> {
        (**self).delete_secret(id, tenant).await
    }
}

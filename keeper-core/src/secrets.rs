use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::SecretApi;
use crate::backend::{DEFAULT_QUERY_TIMEOUT, SecretRepository, with_timeout};
use crate::crypto::{EnvelopeCipher, TenantKey};
use crate::errors::{CryptoError, Result};
use crate::gate::{CallContext, Operation};
use crate::types::{
    EncryptedSecretRow, SealedSecret, SecretDraft, SecretId, SecretRecord, TenantId,
};

/// Per-tenant encryption in front of a [`SecretRepository`].
///
/// The tenant always comes from the [`CallContext`]; the key is derived for the
/// duration of one call and dropped with it.
pub struct SecretOrchestrator<R> {
    repository: R,
    cipher: EnvelopeCipher,
    query_timeout: Duration,
}

impl<R> SecretOrchestrator<R>
where
    R: SecretRepository,
{
    pub fn new(repository: R, cipher: EnvelopeCipher) -> Self {
        Self {
            repository,
            cipher,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    fn seal(&self, draft: &SecretDraft, key: &TenantKey) -> Result<SealedSecret> {
        let content = self.cipher.encrypt(&draft.content, key)?;
        let metadata = draft
            .metadata()
            .map(|value| self.cipher.encrypt(value.as_bytes(), key))
            .transpose()?;

        Ok(SealedSecret {
            kind: draft.kind,
            content,
            metadata,
        })
    }

    fn open(&self, row: EncryptedSecretRow, key: &TenantKey) -> Result<SecretRecord> {
        let content = self.cipher.decrypt(&row.content, key)?;
        let metadata = match row.metadata {
            Some(blob) => {
                let plain = self.cipher.decrypt(&blob, key)?;
                Some(String::from_utf8(plain).map_err(|_| CryptoError::InvalidUtf8)?)
            }
            None => None,
        };

        Ok(SecretRecord {
            id: row.id,
            tenant: row.tenant,
            kind: row.kind,
            content,
            metadata,
            created_at: row.created_at,
        })
    }
}

fn report<T>(result: Result<T>, tenant: TenantId, operation: Operation) -> Result<T> {
    if let Err(err) = &result {
        warn!(
            tenant = %tenant,
            operation = operation.name(),
            error = %err,
            "secret operation failed"
        );
    }
    result
}

#[async_trait]
impl<R> SecretApi for SecretOrchestrator<R>
where
    R: SecretRepository,
{
    async fn create_secret(&self, ctx: &CallContext, draft: SecretDraft) -> Result<SecretId> {
        let tenant = ctx.tenant()?;
        draft.validate()?;

        let result = async {
            let key = self.cipher.derive_key(tenant);
            let sealed = self.seal(&draft, &key)?;
            with_timeout(
                "create_secret",
                self.query_timeout,
                self.repository.create_secret(tenant, sealed),
            )
            .await
        }
        .await;

        let id = report(result, tenant, Operation::CreateSecret)?;
        debug!(tenant = %tenant, secret = %id, kind = %draft.kind, "secret created");
        Ok(id)
    }

    async fn list_secrets(&self, ctx: &CallContext) -> Result<Vec<SecretRecord>> {
        let tenant = ctx.tenant()?;

        let result = async {
            let rows = with_timeout(
                "list_secrets",
                self.query_timeout,
                self.repository.list_secrets(tenant),
            )
            .await?;

            let key = self.cipher.derive_key(tenant);
            rows.into_iter()
                .map(|row| self.open(row, &key))
                .collect::<Result<Vec<_>>>()
        }
        .await;

        report(result, tenant, Operation::ListSecrets)
    }

    async fn update_secret(
        &self,
        ctx: &CallContext,
        id: SecretId,
        draft: SecretDraft,
    ) -> Result<()> {
        let tenant = ctx.tenant()?;
        draft.validate()?;

        let result = async {
            let key = self.cipher.derive_key(tenant);
            let sealed = self.seal(&draft, &key)?;
            with_timeout(
                "update_secret",
                self.query_timeout,
                self.repository.update_secret(id, tenant, sealed),
            )
            .await
        }
        .await;

        report(result, tenant, Operation::UpdateSecret)
    }

    async fn delete_secret(&self, ctx: &CallContext, id: SecretId) -> Result<()> {
        let tenant = ctx.tenant()?;
        let result = with_timeout(
            "delete_secret",
            self.query_timeout,
            self.repository.delete_secret(id, tenant),
        )
        .await;

        report(result, tenant, Operation::DeleteSecret)
    }
}

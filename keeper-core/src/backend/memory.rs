use crate::backend::{SecretRepository, UserRepository};
use crate::errors::{Error, Result};
use crate::types::{EncryptedSecretRow, NewUser, SealedSecret, SecretId, TenantId, UserRecord};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;

const STATE_KEY: &str = "KEEPER_STORE_STATE";

#[derive(Clone, Default, Serialize, Deserialize)]
struct State {
    users: BTreeMap<String, UserRecord>,
    // keyed by id; ids grow monotonically so iteration order is creation order
    secrets: BTreeMap<SecretId, EncryptedSecretRow>,
    next_user_id: i64,
    next_secret_id: i64,
}

impl State {
    fn allocate_user_id(&mut self) -> TenantId {
        self.next_user_id += 1;
        TenantId::new(self.next_user_id)
    }

    fn allocate_secret_id(&mut self) -> SecretId {
        self.next_secret_id += 1;
        SecretId::new(self.next_secret_id)
    }

    fn owned_row_mut(
        &mut self,
        id: SecretId,
        tenant: TenantId,
    ) -> Option<&mut EncryptedSecretRow> {
        self.secrets.get_mut(&id).filter(|row| row.tenant == tenant)
    }
}

#[derive(Clone)]
struct Persistence {
    path: PathBuf,
}

impl Persistence {
    fn load(path: PathBuf) -> Result<(State, Self)> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(Error::storage)?;

        file.lock_exclusive().map_err(Error::storage)?;

        let result = (|| -> Result<State> {
            let reader = BufReader::new(&file);
            for line in reader.lines() {
                let line = line.map_err(Error::storage)?;
                if line.trim().is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = line.split_once('=')
                    && key.trim() == STATE_KEY
                {
                    let decoded = STANDARD_NO_PAD
                        .decode(value.trim())
                        .map_err(Error::storage)?;
                    return serde_json::from_slice(&decoded).map_err(Error::storage);
                }
            }
            Ok(State::default())
        })();

        let _ = FileExt::unlock(&file);
        result.map(|state| (state, Self { path }))
    }

    fn persist(&self, state: &State) -> Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(Error::storage)?;

        file.lock_exclusive().map_err(Error::storage)?;

        let json = serde_json::to_vec(state).map_err(Error::storage)?;
        let encoded = STANDARD_NO_PAD.encode(json);

        let mut writer = BufWriter::new(&file);
        writer
            .write_all(format!("{STATE_KEY}={encoded}\n").as_bytes())
            .map_err(Error::storage)?;
        writer.flush().map_err(Error::storage)?;

        let _ = FileExt::unlock(&file);
        Ok(())
    }
}

/// In-process user and secret store with optional snapshot persistence.
///
/// Each mutation happens under one write lock, so operations on the same row are
/// serialized. When persistence is enabled the post-mutation snapshot is written
/// before the change becomes visible; a failed write leaves the store unchanged.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    persistence: Option<Persistence>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Construct a purely in-memory store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            persistence: None,
        }
    }

    /// Construct a store that loads from and snapshots to `path`.
    pub fn with_persistence<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let (state, persistence) = Persistence::load(path)?;
        debug!(
            path = %persistence.path.display(),
            users = state.users.len(),
            secrets = state.secrets.len(),
            "loaded store snapshot"
        );
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            persistence: Some(persistence),
        })
    }

    /// Applies `apply` and, with persistence, commits only once the new snapshot is on disk.
    ///
    /// The write lock is held until the commit so snapshots reach the file in mutation order.
    fn mutate<T>(&self, apply: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
        let mut guard = self.state.write();
        let Some(persistence) = &self.persistence else {
            return apply(&mut guard);
        };

        let mut next = guard.clone();
        let value = apply(&mut next)?;
        persistence.persist(&next)?;
        *guard = next;
        Ok(value)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn save_user(&self, user: NewUser) -> Result<TenantId> {
        self.mutate(|state| {
            if state.users.contains_key(&user.login) {
                return Err(Error::AlreadyExists { login: user.login });
            }
            let id = state.allocate_user_id();
            state.users.insert(
                user.login.clone(),
                UserRecord {
                    id,
                    login: user.login,
                    password_hash: user.password_hash,
                },
            );
            Ok(id)
        })
    }

    async fn get_user(&self, login: &str) -> Result<UserRecord> {
        self.state
            .read()
            .users
            .get(login)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("user `{login}`")))
    }
}

#[async_trait]
impl SecretRepository for MemoryStore {
    async fn create_secret(&self, tenant: TenantId, sealed: SealedSecret) -> Result<SecretId> {
        self.mutate(|state| {
            let id = state.allocate_secret_id();
            state.secrets.insert(
                id,
                EncryptedSecretRow {
                    id,
                    tenant,
                    kind: sealed.kind,
                    content: sealed.content,
                    metadata: sealed.metadata,
                    created_at: OffsetDateTime::now_utc(),
                },
            );
            Ok(id)
        })
    }

    async fn list_secrets(&self, tenant: TenantId) -> Result<Vec<EncryptedSecretRow>> {
        Ok(self
            .state
            .read()
            .secrets
            .values()
            .filter(|row| row.tenant == tenant)
            .cloned()
            .collect())
    }

    async fn update_secret(
        &self,
        id: SecretId,
        tenant: TenantId,
        sealed: SealedSecret,
    ) -> Result<()> {
        self.mutate(|state| {
            let row = state
                .owned_row_mut(id, tenant)
                .ok_or_else(|| Error::not_found(format!("secret {id}")))?;
            row.kind = sealed.kind;
            row.content = sealed.content;
            row.metadata = sealed.metadata;
            Ok(())
        })
    }

    async fn delete_secret(&self, id: SecretId, tenant: TenantId) -> Result<()> {
        self.mutate(|state| {
            state
                .owned_row_mut(id, tenant)
                .ok_or_else(|| Error::not_found(format!("secret {id}")))?;
            state.secrets.remove(&id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecretKind;

    fn sealed(content: &[u8]) -> SealedSecret {
        SealedSecret {
            kind: SecretKind::Text,
            content: content.to_vec(),
            metadata: None,
        }
    }

    fn user(login: &str) -> NewUser {
        NewUser {
            login: login.into(),
            password_hash: "$argon2id$stub".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_login_is_rejected() {
        let store = MemoryStore::new();
        let first = store.save_user(user("alice")).await.unwrap();
        let second = store.save_user(user("bob")).await.unwrap();
        assert_ne!(first, second);
        let err = store.save_user(user("alice")).await.unwrap_err();
        assert_eq!(
            err,
            Error::AlreadyExists {
                login: "alice".into()
            }
        );
    }

    #[tokio::test]
    async fn unknown_login_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_user("ghost").await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn rows_are_listed_per_tenant_in_creation_order() {
        let store = MemoryStore::new();
        let a = TenantId::new(1);
        let b = TenantId::new(2);
        store.create_secret(a, sealed(b"one")).await.unwrap();
        store.create_secret(b, sealed(b"other")).await.unwrap();
        store.create_secret(a, sealed(b"two")).await.unwrap();

        let rows = store.list_secrets(a).await.unwrap();
        let contents: Vec<_> = rows.iter().map(|row| row.content.as_slice()).collect();
        assert_eq!(contents, vec![b"one".as_slice(), b"two".as_slice()]);
        assert!(rows.iter().all(|row| row.tenant == a));
    }

    #[tokio::test]
    async fn mutations_are_constrained_by_tenant() {
        let store = MemoryStore::new();
        let owner = TenantId::new(1);
        let other = TenantId::new(2);
        let id = store.create_secret(owner, sealed(b"v1")).await.unwrap();

        let err = store
            .update_secret(id, other, sealed(b"stolen"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        let err = store.delete_secret(id, other).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        store.update_secret(id, owner, sealed(b"v2")).await.unwrap();
        let rows = store.list_secrets(owner).await.unwrap();
        assert_eq!(rows[0].content, b"v2");

        store.delete_secret(id, owner).await.unwrap();
        assert!(store.list_secrets(owner).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_secret(id, owner).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn snapshot_survives_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keeper.state");

        let store = MemoryStore::with_persistence(&path).unwrap();
        let tenant = store.save_user(user("alice")).await.unwrap();
        let id = store
            .create_secret(
                tenant,
                SealedSecret {
                    kind: SecretKind::Card,
                    content: vec![1, 2, 3],
                    metadata: Some(vec![9]),
                },
            )
            .await
            .unwrap();
        drop(store);

        let reloaded = MemoryStore::with_persistence(&path).unwrap();
        assert_eq!(reloaded.get_user("alice").await.unwrap().id, tenant);
        let rows = reloaded.list_secrets(tenant).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].kind, SecretKind::Card);
        assert_eq!(rows[0].metadata.as_deref(), Some([9u8].as_slice()));

        let next = reloaded.save_user(user("bob")).await.unwrap();
        assert_ne!(next, tenant);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creates_all_reach_the_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keeper.state");
        let store = MemoryStore::with_persistence(&path).unwrap();
        let tenant = TenantId::new(1);

        let tasks: Vec<_> = (0..64u8)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move { store.create_secret(tenant, sealed(&[n])).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(store.list_secrets(tenant).await.unwrap().len(), 64);
        drop(store);

        let reloaded = MemoryStore::with_persistence(&path).unwrap();
        let rows = reloaded.list_secrets(tenant).await.unwrap();
        assert_eq!(rows.len(), 64);
        let id = reloaded.create_secret(tenant, sealed(b"next")).await.unwrap();
        assert_eq!(id, SecretId::new(65));
    }

    #[tokio::test]
    async fn failed_snapshot_write_leaves_state_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let state_dir = dir.path().join("state");
        std::fs::create_dir(&state_dir).unwrap();
        let store = MemoryStore::with_persistence(state_dir.join("keeper.state")).unwrap();
        let tenant = TenantId::new(1);
        let kept = store.create_secret(tenant, sealed(b"kept")).await.unwrap();

        std::fs::remove_dir_all(&state_dir).unwrap();

        let err = store.create_secret(tenant, sealed(b"lost")).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        let err = store.delete_secret(kept, tenant).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(matches!(
            store.save_user(user("alice")).await,
            Err(Error::Storage(_))
        ));

        let rows = store.list_secrets(tenant).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, kept);
        assert!(store.get_user("alice").await.is_err());
    }
}

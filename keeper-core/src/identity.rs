use std::sync::Arc;
use std::time::Duration;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::api::AuthApi;
use crate::backend::{DEFAULT_QUERY_TIMEOUT, UserRepository, with_timeout};
use crate::credentials::CredentialManager;
use crate::errors::{Error, Result};
use crate::types::NewUser;

/// Verified against on unknown logins so they cost as much as a wrong password.
/// Parameters match `Argon2::default()`; the digest is all zero bytes.
const DUMMY_PASSWORD_HASH: &str = concat!(
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA",
    "$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
);

/// Registration and login on top of a [`UserRepository`].
///
/// Passwords are stored as Argon2id PHC strings. A failed login never says
/// whether the login or the password was wrong.
pub struct IdentityOrchestrator<R> {
    users: R,
    credentials: Arc<CredentialManager>,
    query_timeout: Duration,
}

impl<R> IdentityOrchestrator<R>
where
    R: UserRepository,
{
    pub fn new(users: R, credentials: Arc<CredentialManager>) -> Self {
        Self {
            users,
            credentials,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

#[async_trait]
impl<R> AuthApi for IdentityOrchestrator<R>
where
    R: UserRepository,
{
    async fn register(&self, login: &str, password: &str) -> Result<String> {
        if login.is_empty() || password.is_empty() {
            return Err(Error::Invalid("login and password must not be empty".into()));
        }

        let password_hash = hash_password(password.to_owned()).await?;
        let user = NewUser {
            login: login.to_owned(),
            password_hash,
        };
        let tenant = with_timeout("save_user", self.query_timeout, self.users.save_user(user))
            .await
            .inspect_err(|err| warn!(login, error = %err, "registration failed"))?;

        info!(tenant = %tenant, "user registered");
        self.credentials.generate(tenant)
    }

    async fn login(&self, login: &str, password: &str) -> Result<String> {
        let user = match with_timeout("get_user", self.query_timeout, self.users.get_user(login))
            .await
        {
            Ok(user) => user,
            Err(Error::NotFound { .. }) => {
                verify_password(password.to_owned(), DUMMY_PASSWORD_HASH.to_owned()).await?;
                return Err(Error::InvalidCredentials);
            }
            Err(err) => {
                warn!(login, error = %err, "user lookup failed");
                return Err(err);
            }
        };

        if !verify_password(password.to_owned(), user.password_hash).await? {
            return Err(Error::InvalidCredentials);
        }

        self.credentials.generate(user.id)
    }
}

async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| Error::Internal(format!("password hashing failed: {err}")))
    })
    .await
    .map_err(|err| Error::Internal(format!("password hashing task failed: {err}")))?
}

async fn verify_password(password: String, stored: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored)
            .map_err(|err| Error::Internal(format!("stored password hash is unreadable: {err}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|err| Error::Internal(format!("password verification task failed: {err}")))?
}

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::errors::{AuthError, Error, Result};
use crate::types::TenantId;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Default lifetime of an issued token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    uid: i64,
    iat: i64,
    exp: i64,
}

/// Issues and validates HMAC-signed identity tokens.
///
/// The signing key is the single server-wide secret. Validation checks the
/// algorithm, signature and expiry before any claim is read, so an identity is
/// only ever returned from a fully verified token.
pub struct CredentialManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl CredentialManager {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self::with_ttl(secret, DEFAULT_TOKEN_TTL)
    }

    pub fn with_ttl(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Produces a signed token binding `tenant`.
    pub fn generate(&self, tenant: TenantId) -> Result<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            uid: tenant.get(),
            iat: now,
            exp: now.saturating_add(ttl),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding)
            .map_err(|err| Error::Internal(format!("failed to sign token: {err}")))
    }

    /// Verifies `token` and returns the tenant it asserts.
    pub fn validate(&self, token: &str) -> std::result::Result<TenantId, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| TenantId::new(data.claims.uid))
            .map_err(|err| {
                debug!(reason = %err, "token rejected");
                AuthError::InvalidToken
            })
    }
}

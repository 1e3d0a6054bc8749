use crate::errors::CryptoError;
use crate::types::TenantId;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

/// Length of a derived AES-256 key in bytes.
pub const KEY_LEN: usize = 32;
/// AES-GCM nonce length; every ciphertext starts with a fresh nonce of this size.
pub const NONCE_LEN: usize = 12;
/// PBKDF2-HMAC-SHA256 iteration count used for tenant key derivation.
pub const KDF_ITERATIONS: u32 = 4096;

/// Symmetric key scoped to exactly one tenant.
///
/// Keys are never stored; callers derive one per operation and pass it explicitly
/// to [`EnvelopeCipher::encrypt`] / [`EnvelopeCipher::decrypt`]. The key material is
/// wiped on drop.
pub struct TenantKey {
    tenant: TenantId,
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl TenantKey {
    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    fn as_aes_key(&self) -> &Key<Aes256Gcm> {
        Key::<Aes256Gcm>::from_slice(self.bytes.as_slice())
    }
}

impl fmt::Debug for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantKey")
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}

/// Envelope crypto service: per-tenant key derivation plus AES-256-GCM.
///
/// The service holds only the server-wide secret and is never mutated after
/// construction, so one instance can be shared across any number of concurrent
/// calls.
pub struct EnvelopeCipher {
    secret: Zeroizing<Vec<u8>>,
}

impl EnvelopeCipher {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Zeroizing::new(secret.as_ref().to_vec()),
        }
    }

    /// Derives the key for `tenant` from the server secret.
    ///
    /// The tenant id, rendered in decimal, is the PBKDF2 salt. The result is a pure
    /// function of (secret, tenant).
    pub fn derive_key(&self, tenant: TenantId) -> TenantKey {
        let salt = tenant.get().to_string();
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(
            self.secret.as_slice(),
            salt.as_bytes(),
            KDF_ITERATIONS,
            bytes.as_mut_slice(),
        );
        TenantKey { tenant, bytes }
    }

    /// Encrypts `plaintext`, returning `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8], key: &TenantKey) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new(key.as_aes_key());
        let nonce = random_nonce();
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&sealed);
        Ok(blob)
    }

    /// Splits the nonce prefix off `blob`, then authenticates and decrypts the rest.
    pub fn decrypt(&self, blob: &[u8], key: &TenantKey) -> Result<Vec<u8>, CryptoError> {
        if blob.len() < NONCE_LEN {
            return Err(CryptoError::Truncated);
        }
        let (nonce, sealed) = blob.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(key.as_aes_key());
        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}

impl fmt::Debug for EnvelopeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCipher").finish_non_exhaustive()
    }
}

fn random_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);
    nonce
}

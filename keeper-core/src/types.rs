use crate::errors::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Identity of a registered user; the unit of isolation for stored secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(i64);

impl TenantId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage-assigned identifier of a secret row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretId(i64);

impl SecretId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of secret kinds, tagged identically on the wire and in storage.
///
/// Unknown tags decode to [`SecretKind::Unspecified`] rather than failing, so the
/// sentinel is the single representation of "no valid kind".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecretKind {
    #[default]
    Unspecified,
    Credentials,
    Text,
    Card,
    Binary,
}

impl SecretKind {
    pub const VALID: [SecretKind; 4] = [
        SecretKind::Credentials,
        SecretKind::Text,
        SecretKind::Card,
        SecretKind::Binary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SecretKind::Unspecified => "UNSPECIFIED",
            SecretKind::Credentials => "CREDENTIALS",
            SecretKind::Text => "TEXT",
            SecretKind::Card => "CARD",
            SecretKind::Binary => "BINARY",
        }
    }

    pub fn is_valid(self) -> bool {
        self != SecretKind::Unspecified
    }

    /// Maps any unknown tag to the sentinel.
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "UNSPECIFIED" => Ok(SecretKind::Unspecified),
            "CREDENTIALS" => Ok(SecretKind::Credentials),
            "TEXT" => Ok(SecretKind::Text),
            "CARD" => Ok(SecretKind::Card),
            "BINARY" => Ok(SecretKind::Binary),
            other => Err(Error::Invalid(format!("unknown secret kind `{other}`"))),
        }
    }
}

impl Serialize for SecretKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SecretKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(SecretKind::from_tag(&tag))
    }
}

/// Plaintext secret as supplied by a caller, before it is bound to a tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretDraft {
    pub kind: SecretKind,
    pub content: Vec<u8>,
    pub metadata: Option<String>,
}

impl SecretDraft {
    pub fn new(kind: SecretKind, content: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Metadata that should be encrypted, if any. Empty metadata counts as absent.
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref().filter(|value| !value.is_empty())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.kind.is_valid() {
            return Err(Error::Invalid("secret kind must be specified".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for SecretDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretDraft")
            .field("kind", &self.kind)
            .field("content_len", &self.content.len())
            .field("has_metadata", &self.metadata().is_some())
            .finish()
    }
}

/// Decrypted secret handed back to its owner.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub id: SecretId,
    pub tenant: TenantId,
    pub kind: SecretKind,
    pub content: Vec<u8>,
    pub metadata: Option<String>,
    pub created_at: OffsetDateTime,
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("id", &self.id)
            .field("tenant", &self.tenant)
            .field("kind", &self.kind)
            .field("content_len", &self.content.len())
            .field("has_metadata", &self.metadata.is_some())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Ciphertext payload produced by the secret orchestrator for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedSecret {
    pub kind: SecretKind,
    pub content: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<u8>>,
}

/// The only persisted form of a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecretRow {
    pub id: SecretId,
    pub tenant: TenantId,
    pub kind: SecretKind,
    pub content: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<u8>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login: String,
    pub password_hash: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("login", &self.login)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: TenantId,
    pub login: String,
    pub password_hash: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("login", &self.login)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

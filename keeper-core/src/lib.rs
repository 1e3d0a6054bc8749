//! Tenant-isolated secret storage: credential tokens, the per-call request gate,
//! envelope encryption and the orchestrators that tie them to a repository.

pub mod api;
pub mod backend;
pub mod credentials;
pub mod crypto;
pub mod errors;
pub mod gate;
pub mod identity;
pub mod secrets;
pub mod types;

pub use api::{AuthApi, SecretApi};
pub use backend::{MemoryStore, SecretRepository, UserRepository};
pub use credentials::CredentialManager;
pub use crypto::{EnvelopeCipher, TenantKey};
pub use errors::{AuthError, CryptoError, Error, Result};
pub use gate::{CallContext, Operation, RequestGate};
pub use identity::IdentityOrchestrator;
pub use secrets::SecretOrchestrator;
pub use types::{
    EncryptedSecretRow, NewUser, SealedSecret, SecretDraft, SecretId, SecretKind, SecretRecord,
    TenantId, UserRecord,
};

pub mod envelope;

pub use envelope::{EnvelopeCipher, KDF_ITERATIONS, KEY_LEN, NONCE_LEN, TenantKey};

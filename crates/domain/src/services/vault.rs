//! Credential Vault contract (C9, §4.8).
//!
//! Infrastructure provides the concrete AES-256-GCM implementation; this
//! module only defines the capability the rest of the domain depends on.

use crate::errors::VaultError;

/// Symmetric authenticated encryption of tokens and BYO client secrets.
/// Each encryption uses a fresh random nonce and the output self-describes
/// it, so `decrypt` never needs an out-of-band nonce.
pub trait CredentialVault: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, VaultError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, VaultError>;
}

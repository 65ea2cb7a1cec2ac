//! AES-256-GCM Credential Vault (C9, §4.8).
//!
//! Each ciphertext self-describes its nonce: output is
//! `base64(nonce || ciphertext_with_tag)`, so `decrypt` never needs an
//! out-of-band nonce.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use domain::errors::VaultError;
use domain::services::vault::CredentialVault;
use rand::RngCore;

const NONCE_LEN: usize = 12;

/// Symmetric encryption backed by a single 32-byte key, as accepted from
/// `ENCRYPTION_KEY` (§6.4). The core never manages key rotation itself.
pub struct AesGcmVault {
    cipher: Aes256Gcm,
}

impl AesGcmVault {
    pub fn new(key: &[u8; 32]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Parses a hex or raw 32-byte key from the environment. Accepts raw
    /// UTF-8 bytes of length 32, or a 64-character hex string.
    pub fn from_env_value(raw: &str) -> Result<Self, VaultError> {
        let bytes = if raw.len() == 64 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            hex_decode(raw).ok_or_else(|| VaultError::EncryptionError {
                operation: "parse_key".to_string(),
            })?
        } else {
            raw.as_bytes().to_vec()
        };

        if bytes.len() != 32 {
            return Err(VaultError::EncryptionError {
                operation: "parse_key".to_string(),
            });
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(Self::new(&key))
    }
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

impl CredentialVault for AesGcmVault {
    fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::EncryptionError {
                operation: "encrypt".to_string(),
            })?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, VaultError> {
        let combined = BASE64
            .decode(ciphertext)
            .map_err(|_| VaultError::EncryptionError {
                operation: "decrypt".to_string(),
            })?;

        if combined.len() < NONCE_LEN {
            return Err(VaultError::EncryptionError {
                operation: "decrypt".to_string(),
            });
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext =
            self.cipher
                .decrypt(nonce, ciphertext)
                .map_err(|_| VaultError::EncryptionError {
                    operation: "decrypt".to_string(),
                })?;

        String::from_utf8(plaintext).map_err(|_| VaultError::EncryptionError {
            operation: "decrypt".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> AesGcmVault {
        AesGcmVault::new(&[7u8; 32])
    }

    #[test]
    fn round_trips_plaintext() {
        let v = vault();
        let ciphertext = v.encrypt("super-secret-token").unwrap();
        assert_ne!(ciphertext, "super-secret-token");
        assert_eq!(v.decrypt(&ciphertext).unwrap(), "super-secret-token");
    }

    #[test]
    fn two_encryptions_of_same_plaintext_differ() {
        let v = vault();
        let a = v.encrypt("same-value").unwrap();
        let b = v.encrypt("same-value").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let a = AesGcmVault::new(&[1u8; 32]);
        let b = AesGcmVault::new(&[2u8; 32]);
        let ciphertext = a.encrypt("value").unwrap();
        assert!(b.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_to_decrypt() {
        let v = vault();
        let mut ciphertext = BASE64.decode(v.encrypt("value").unwrap()).unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;
        let tampered = BASE64.encode(ciphertext);
        assert!(v.decrypt(&tampered).is_err());
    }
}

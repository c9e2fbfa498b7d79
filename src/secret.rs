//! Password generation and at-rest encryption of secret material.
//!
//! Generated passwords are alphanumeric only. Punctuation in a generated
//! password can corrupt the composed backend DSN, so the character set is
//! constrained at generation time rather than escaped downstream.

use crate::error::ComposeError;
use rand::{distributions::Alphanumeric, Rng};

use argon2::Argon2;
use chacha20poly1305::{
    aead::{Aead, NewAead},
    ChaCha20Poly1305, Key, Nonce,
};

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const SALT_SIZE: usize = 32;

/// Generate a random alphanumeric password.
pub fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Encrypt secret material for storage.
///
/// Uses ChaCha20-Poly1305 with Argon2id key derivation.
/// Format: salt (32 bytes) || nonce (12 bytes) || ciphertext
pub fn encrypt_payload(plaintext: &[u8], password: &str) -> Result<Vec<u8>, ComposeError> {
    let salt: [u8; SALT_SIZE] = rand::random();
    let nonce_bytes: [u8; NONCE_SIZE] = rand::random();

    let key = derive_key(password, &salt)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| ComposeError::Crypto(format!("encryption failed: {}", e)))?;

    let mut result = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&salt);
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypt secret material.
///
/// Input format: salt (32 bytes) || nonce (12 bytes) || ciphertext
pub fn decrypt_payload(encrypted: &[u8], password: &str) -> Result<Vec<u8>, ComposeError> {
    const MIN_LEN: usize = SALT_SIZE + NONCE_SIZE + 16; // 16 = poly1305 tag
    if encrypted.len() < MIN_LEN {
        return Err(ComposeError::Crypto("encrypted data too short".into()));
    }

    let salt = &encrypted[..SALT_SIZE];
    let nonce_bytes = &encrypted[SALT_SIZE..SALT_SIZE + NONCE_SIZE];
    let ciphertext = &encrypted[SALT_SIZE + NONCE_SIZE..];

    let key = derive_key(password, salt)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let nonce = Nonce::from_slice(nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| ComposeError::Crypto("decryption failed - wrong password".into()))?;

    Ok(plaintext)
}

fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_SIZE], ComposeError> {
    let mut key = [0u8; KEY_SIZE];

    // Argon2id: memory 64 MiB, iterations 2, parallelism 2
    let params = argon2::Params::new(1 << 16, 2, 2, Some(KEY_SIZE))
        .map_err(|e| ComposeError::Crypto(format!("argon2 params: {}", e)))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| ComposeError::Crypto(format!("key derivation failed: {}", e)))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_is_alphanumeric() {
        for _ in 0..16 {
            let password = generate_password(32);
            assert_eq!(password.len(), 32);
            assert!(
                password.chars().all(|c| c.is_ascii_alphanumeric()),
                "password contains punctuation: {}",
                password
            );
        }
    }

    #[test]
    fn test_generated_passwords_differ() {
        assert_ne!(generate_password(32), generate_password(32));
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let material = br#"{"password":"aB9xY2kQ"}"#;
        let password = "hunter2";

        let encrypted = encrypt_payload(material, password).unwrap();

        // Encrypted should be larger (salt + nonce + tag)
        assert!(encrypted.len() > material.len());

        let decrypted = decrypt_payload(&encrypted, password).unwrap();
        assert_eq!(decrypted, material);
    }

    #[test]
    fn test_wrong_password_fails() {
        let encrypted = encrypt_payload(b"secret material", "correct").unwrap();
        let result = decrypt_payload(&encrypted, "wrong");
        assert!(result.is_err());
    }

    #[test]
    fn test_truncated_data_fails() {
        let encrypted = vec![0u8; 10]; // Too short
        let result = decrypt_payload(&encrypted, "password");
        assert!(result.is_err());
    }
}

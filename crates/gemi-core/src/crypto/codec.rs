//! AES-256-GCM sealing of entry content.
//!
//! A sealed bundle is a single byte sequence suitable for one BLOB column:
//!
//! ```text
//! nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```
//!
//! Every call to [`encrypt`] draws a fresh nonce from the OS RNG. Nonces are
//! never cached or derived from content.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::crypto::key::JournalKey;
use crate::error::{JournalError, Result};

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key`, returning `nonce || ciphertext || tag`.
///
/// # Examples
///
/// ```
/// use gemi_core::crypto::{decrypt, encrypt, JournalKey};
///
/// let key = JournalKey::generate().unwrap();
/// let sealed = encrypt("dear diary", &key).unwrap();
/// assert_eq!(decrypt(&sealed, &key).unwrap(), "dear diary");
/// ```
pub fn encrypt(plaintext: &str, key: &JournalKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| JournalError::Encryption(format!("AES key init failed: {}", e)))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| JournalError::Encryption(format!("AES-GCM encrypt failed: {}", e)))?;

    let mut bundle = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    bundle.extend_from_slice(&nonce);
    bundle.extend_from_slice(&ciphertext);
    Ok(bundle)
}

/// Decrypt a bundle produced by [`encrypt`].
///
/// Fails closed: a short bundle, a tag mismatch (tampering or wrong key), or
/// plaintext that is not UTF-8 all yield `JournalError::Decryption` and no
/// partial output.
pub fn decrypt(bundle: &[u8], key: &JournalKey) -> Result<String> {
    if bundle.len() < NONCE_LEN + TAG_LEN {
        return Err(JournalError::Decryption(format!(
            "Ciphertext bundle too short ({} bytes)",
            bundle.len()
        )));
    }

    let (nonce, ciphertext) = bundle.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| JournalError::Decryption(format!("AES key init failed: {}", e)))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| {
            JournalError::Decryption("Authentication failed (tampered data or wrong key)".to_string())
        })?;

    String::from_utf8(plaintext)
        .map_err(|_| JournalError::Decryption("Decrypted content is not valid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::KEY_LENGTH;

    fn test_key() -> JournalKey {
        JournalKey::from_bytes([0x42; KEY_LENGTH])
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = test_key();
        let samples = [
            "a",
            "Hello, World! This is secret data.",
            "multi\nline\tentry",
            "emoji 🌧️ and ünïcödé",
        ];
        for plaintext in samples {
            let sealed = encrypt(plaintext, &key).unwrap();
            assert_eq!(decrypt(&sealed, &key).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_bundle_layout() {
        let key = test_key();
        let plaintext = "twelve bytes";
        let sealed = encrypt(plaintext, &key).unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + plaintext.len() + TAG_LEN);
    }

    #[test]
    fn test_same_plaintext_different_bundles() {
        let key = test_key();
        let first = encrypt("same plaintext", &key).unwrap();
        let second = encrypt("same plaintext", &key).unwrap();

        assert_ne!(first, second);
        assert_ne!(first[..NONCE_LEN], second[..NONCE_LEN]);
    }

    #[test]
    fn test_any_flipped_byte_fails() {
        let key = test_key();
        let sealed = encrypt("saw the Colosseum", &key).unwrap();

        for index in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[index] ^= 0x01;
            let result = decrypt(&tampered, &key);
            assert!(
                matches!(result, Err(JournalError::Decryption(_))),
                "byte {} flip was not detected",
                index
            );
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = encrypt("secret", &test_key()).unwrap();
        let other = JournalKey::from_bytes([0x24; KEY_LENGTH]);
        assert!(matches!(
            decrypt(&sealed, &other),
            Err(JournalError::Decryption(_))
        ));
    }

    #[test]
    fn test_short_bundle_fails() {
        let key = test_key();
        assert!(decrypt(&[0u8; NONCE_LEN + TAG_LEN - 1], &key).is_err());
        assert!(decrypt(&[], &key).is_err());
    }

    #[test]
    fn test_empty_plaintext_round_trip() {
        let key = test_key();
        let sealed = encrypt("", &key).unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + TAG_LEN);
        assert_eq!(decrypt(&sealed, &key).unwrap(), "");
    }
}

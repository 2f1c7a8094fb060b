//! The journal encryption key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{JournalError, Result};

/// Length of the key in bytes (32 bytes = 256 bits for AES-256-GCM).
pub const KEY_LENGTH: usize = 32;

/// A 256-bit symmetric key for sealing journal content.
///
/// Key material is zeroized from memory when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct JournalKey {
    key: [u8; KEY_LENGTH],
}

impl JournalKey {
    /// Wrap raw key bytes.
    ///
    /// # Security
    ///
    /// The caller is responsible for ensuring the bytes come from a secure source.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key: bytes }
    }

    /// Generate a fresh key from the operating system's RNG.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; KEY_LENGTH];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| JournalError::KeyStore(format!("Failed to generate key bytes: {}", e)))?;
        let key = Self::from_bytes(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Get a reference to the raw key bytes.
    ///
    /// # Security
    ///
    /// Avoid storing or logging this value. Use only for immediate encryption operations.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Encode the key for a text-only credential store.
    pub(crate) fn to_encoded(&self) -> String {
        STANDARD.encode(self.key)
    }

    /// Decode a key previously produced by `to_encoded`.
    pub(crate) fn from_encoded(encoded: &str) -> Result<Self> {
        let mut decoded = STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(|e| JournalError::KeyStore(format!("Stored key is not valid base64: {}", e)))?;
        if decoded.len() != KEY_LENGTH {
            let len = decoded.len();
            decoded.zeroize();
            return Err(JournalError::KeyStore(format!(
                "Stored key has wrong length (expected {} bytes, got {})",
                KEY_LENGTH, len
            )));
        }
        let mut bytes = [0u8; KEY_LENGTH];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        let key = Self::from_bytes(bytes);
        bytes.zeroize();
        Ok(key)
    }
}

impl std::fmt::Debug for JournalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_differ() {
        let key1 = JournalKey::generate().unwrap();
        let key2 = JournalKey::generate().unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_encoded_key_round_trip() {
        let key = JournalKey::generate().unwrap();
        let decoded = JournalKey::from_encoded(&key.to_encoded()).unwrap();
        assert_eq!(key.as_bytes(), decoded.as_bytes());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let short = STANDARD.encode([7u8; 16]);
        let result = JournalKey::from_encoded(&short);
        assert!(matches!(result, Err(JournalError::KeyStore(_))));
        assert!(result.unwrap_err().to_string().contains("wrong length"));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(JournalKey::from_encoded("not base64 at all!").is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let key = JournalKey::from_bytes([0xAB; KEY_LENGTH]);
        let debug_output = format!("{:?}", key);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains(&hex::encode(&key.as_bytes()[..4])));
    }
}

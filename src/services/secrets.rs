use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// A credential plaintext. `Debug` and `Display` are deliberately not
/// derived/implemented, so a secret can never reach a tracing call site or a
/// format string; callers that genuinely need the plaintext (the reveal
/// endpoint, the bearer header of a probe) must go through [`Secret::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw plaintext. Keep call sites to the reveal path and
    /// probe header construction.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// AES-256-GCM cipher for credentials at rest. Ciphertext layout is
/// base64(nonce || ciphertext), nonce 12 bytes.
#[derive(Clone)]
pub struct SecretCipher {
    key: Vec<u8>,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SecretCipher {
    /// Loads the master key from CONTROL_PLANE_MASTER_KEY (base64, 32 bytes).
    pub fn from_env() -> Result<Self> {
        let key_str = std::env::var("CONTROL_PLANE_MASTER_KEY").unwrap_or_else(|_| {
            // Generate a default key for development
            // In production, this should be set in the environment
            tracing::warn!("CONTROL_PLANE_MASTER_KEY not set, using default key (INSECURE!)");
            BASE64.encode(&b"ThisIsA32ByteKeyForDevelopmentOnly!!!!!!!!!"[..32])
        });

        Self::from_base64_key(&key_str)
    }

    pub fn from_base64_key(key_str: &str) -> Result<Self> {
        let key_bytes = BASE64
            .decode(key_str)
            .map_err(|e| anyhow!("Invalid master key encoding: {}", e))?;

        if key_bytes.len() != 32 {
            return Err(anyhow!("Master key must be exactly 32 bytes"));
        }

        Ok(Self { key: key_bytes })
    }

    pub fn generate_master_key() -> String {
        let mut key = [0u8; 32];
        use rand::RngCore;
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    pub fn encrypt(&self, plaintext: &Secret) -> Result<String> {
        let key = Key::<Aes256Gcm>::from_slice(&self.key);
        let cipher = Aes256Gcm::new(key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.expose().as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        // Combine nonce and ciphertext
        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&combined))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<Secret> {
        let combined = BASE64
            .decode(encrypted)
            .map_err(|e| anyhow!("Invalid encrypted data encoding: {}", e))?;

        if combined.len() < 12 {
            return Err(anyhow!("Invalid encrypted data: too short"));
        }

        // Split nonce and ciphertext
        let (nonce, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce);

        let key = Key::<Aes256Gcm>::from_slice(&self.key);
        let cipher = Aes256Gcm::new(key);
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| anyhow!("Decryption failed: {}", e))?;

        String::from_utf8(plaintext)
            .map(Secret::new)
            .map_err(|e| anyhow!("Invalid UTF-8 in decrypted data: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> SecretCipher {
        SecretCipher::from_base64_key(&SecretCipher::generate_master_key()).unwrap()
    }

    #[test]
    fn test_encryption_decryption() {
        let cipher = test_cipher();
        let plaintext = Secret::new("This is a secret token!");

        let encrypted = cipher.encrypt(&plaintext).unwrap();
        assert_ne!(encrypted, plaintext.expose());

        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted.expose(), plaintext.expose());
    }

    #[test]
    fn test_different_encryptions() {
        let cipher = test_cipher();
        let plaintext = Secret::new("Same text");

        let encrypted1 = cipher.encrypt(&plaintext).unwrap();
        let encrypted2 = cipher.encrypt(&plaintext).unwrap();

        // Different nonces should produce different ciphertexts
        assert_ne!(encrypted1, encrypted2);

        // But both should decrypt to the same plaintext
        assert_eq!(cipher.decrypt(&encrypted1).unwrap().expose(), "Same text");
        assert_eq!(cipher.decrypt(&encrypted2).unwrap().expose(), "Same text");
    }

    #[test]
    fn test_invalid_encrypted_data() {
        let cipher = test_cipher();

        // Invalid base64
        assert!(cipher.decrypt("not-base64!@#").is_err());

        // Too short
        assert!(cipher.decrypt("dGVzdA==").is_err());

        // Invalid ciphertext
        let invalid = BASE64.encode(vec![0u8; 20]);
        assert!(cipher.decrypt(&invalid).is_err());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("tok123");
        assert_eq!(format!("{:?}", secret), "Secret([REDACTED])");
    }
}

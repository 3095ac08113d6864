//! Cryptographic primitives: endpoint-secret encryption, HMAC signing,
//! API-key hashing, and id/token generation.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha512};

use crate::error::{Error, Result};

type HmacSha256 = Hmac<sha2::Sha256>;

const NONCE_LEN: usize = 12;

/// A validated 32-byte encryption key for endpoint secrets.
///
/// Construction is the only place the length constraint (`> 8` bytes) from
/// configuration is enforced; everywhere else this is just `[u8; 32]`.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Build a key from raw configuration bytes. Rejects keys of length <= 8,
    /// matching the source's `len(encryptionKey) > 8` startup check. Keys
    /// shorter than 32 bytes are zero-padded; longer ones are truncated, so
    /// operators can hand us a passphrase rather than exactly 32 bytes.
    pub fn from_config_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() <= 8 {
            return Err(Error::Config(
                "encryptionKey must be longer than 8 bytes".into(),
            ));
        }
        let mut key = [0u8; 32];
        let n = raw.len().min(32);
        key[..n].copy_from_slice(&raw[..n]);
        Ok(Self(key))
    }
}

/// Encrypt a webhook secret with AES-256-GCM. Output is
/// `hex(nonce || ciphertext || tag)`.
pub fn encrypt_secret(plaintext: &[u8], key: &EncryptionKey) -> Result<String> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("encrypt failed: {e}")))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);

    Ok(hex::encode(out))
}

/// Decrypt a value produced by [`encrypt_secret`].
pub fn decrypt_secret(hex_encoded: &str, key: &EncryptionKey) -> Result<Vec<u8>> {
    let raw = hex::decode(hex_encoded).map_err(|e| Error::Crypto(format!("bad hex: {e}")))?;
    if raw.len() < NONCE_LEN {
        return Err(Error::Crypto("ciphertext too short".into()));
    }
    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| Error::Crypto(format!("decrypt failed: {e}")))
}

/// HMAC-SHA256 over `payload`, hex-encoded.
pub fn sign_hmac(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Build the `payloadToSign` for a delivery: `unix_seconds + "." + body`.
pub fn signing_payload(unix_seconds: i64, body: &str) -> String {
    format!("{unix_seconds}.{body}")
}

/// Build the outgoing signature header value: `t=<unix>,v1=<hex hmac>`.
pub fn signature_header_value(unix_seconds: i64, body: &str, secret: &str) -> String {
    let payload = signing_payload(unix_seconds, body);
    let sig = sign_hmac(&payload, secret);
    format!("t={unix_seconds},v1={sig}")
}

/// Triple-round SHA-512 over hex-encoded intermediaries, used to hash API
/// keys. Not a password KDF — preserved for on-disk format compatibility
/// with the source this was distilled from.
pub fn hash_api_key(clear_text: &str) -> String {
    let h1 = hex::encode(Sha512::digest(clear_text.as_bytes()));
    let h2 = hex::encode(Sha512::digest(h1.as_bytes()));
    let h3 = hex::encode(Sha512::digest(h2.as_bytes()));
    h3
}

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = (rng.next_u32() as usize) % ALPHANUMERIC.len();
            ALPHANUMERIC[idx] as char
        })
        .collect()
}

/// Generate a new clear-text API key: `sk_` + 36 random alphanumeric chars.
pub fn generate_api_key() -> String {
    format!("sk_{}", random_alphanumeric(36))
}

/// Generate a new clear-text webhook secret token: `zhwhsec_` + 30 random
/// alphanumeric chars.
pub fn generate_webhook_secret() -> String {
    format!("zhwhsec_{}", random_alphanumeric(30))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = EncryptionKey::from_config_bytes(b"0123456789abcdef0123456789abcdef").unwrap();
        let secret = b"zhwhsec_abcdefghijklmnopqrstuvwxyz0123";
        let encrypted = encrypt_secret(secret, &key).unwrap();
        let decrypted = decrypt_secret(&encrypted, &key).unwrap();
        assert_eq!(decrypted, secret);
    }

    #[test]
    fn test_encrypt_is_nondeterministic() {
        let key = EncryptionKey::from_config_bytes(b"0123456789abcdef0123456789abcdef").unwrap();
        let a = encrypt_secret(b"same plaintext", &key).unwrap();
        let b = encrypt_secret(b"same plaintext", &key).unwrap();
        assert_ne!(a, b, "random nonce should make ciphertexts differ");
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(EncryptionKey::from_config_bytes(b"short").is_err());
    }

    #[test]
    fn test_signature_header_value() {
        // scenario 6 from the spec
        let secret = "zhwhsec_abc";
        let t = 1_700_000_000i64;
        let body = r#"{"a":1}"#;
        let expected_sig = sign_hmac(&format!("{t}.{body}"), secret);
        let header = signature_header_value(t, body, secret);
        assert_eq!(header, format!("t={t},v1={expected_sig}"));
    }

    #[test]
    fn test_hash_api_key_deterministic() {
        let a = hash_api_key("sk_testkey");
        let b = hash_api_key("sk_testkey");
        assert_eq!(a, b);
        assert_eq!(a.len(), 128); // hex(sha512) = 128 chars
    }

    #[test]
    fn test_hash_api_key_differs_by_input() {
        assert_ne!(hash_api_key("sk_one"), hash_api_key("sk_two"));
    }

    #[test]
    fn test_generate_api_key_format() {
        let key = generate_api_key();
        assert!(key.starts_with("sk_"));
        assert_eq!(key.len(), 3 + 36);
    }

    #[test]
    fn test_generate_webhook_secret_format() {
        let secret = generate_webhook_secret();
        assert!(secret.starts_with("zhwhsec_"));
        assert_eq!(secret.len(), 8 + 30);
    }
}

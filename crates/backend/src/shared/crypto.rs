//! Криптографические примитивы оркестратора.
//!
//! - AES-256-GCM для учетных данных маркетплейсов в базе
//! - HMAC-SHA256 для подписей вебхуков

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

/// Nonce size for AES-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

type HmacSha256 = Hmac<Sha256>;

static CREDENTIAL_KEY: OnceCell<[u8; 32]> = OnceCell::new();

/// Инициализация ключа шифрования учетных данных.
///
/// Принимает base64-ключ из конфигурации (ровно 32 байта после
/// декодирования) либо любую другую строку, из которой ключ выводится
/// через SHA-256. Без настроенного ключа генерируется случайный на время
/// процесса: перезапуск сервера сделает сохраненные учетные данные
/// нечитаемыми.
pub fn initialize_credential_key(configured: Option<&str>) -> anyhow::Result<()> {
    let key = match configured {
        Some(encoded) => {
            match BASE64.decode(encoded.trim()) {
                Ok(bytes) if bytes.len() == 32 => {
                    let mut key = [0u8; 32];
                    key.copy_from_slice(&bytes);
                    key
                }
                _ => {
                    tracing::warn!(
                        "credential_key is not 32 bytes of base64, deriving key via SHA-256"
                    );
                    derive_key(encoded.trim().as_bytes())
                }
            }
        }
        None => {
            tracing::warn!(
                "No credential_key configured, using an ephemeral key: stored credentials will not survive a restart"
            );
            use rand::rngs::OsRng;
            use rand::RngCore;
            let mut key = [0u8; 32];
            OsRng.fill_bytes(&mut key);
            key
        }
    };

    CREDENTIAL_KEY
        .set(key)
        .map_err(|_| anyhow::anyhow!("Credential key has already been initialized"))
}

pub fn get_credential_key() -> &'static [u8; 32] {
    CREDENTIAL_KEY
        .get()
        .expect("Credential key has not been initialized")
}

fn derive_key(material: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(material);
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

/// Зашифровать секрет для хранения в базе.
///
/// Формат: base64(nonce || ciphertext || auth_tag)
pub fn encrypt_secret(plaintext: &str, key: &[u8; 32]) -> anyhow::Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("Cipher init failed: {}", e))?;

    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(&result))
}

/// Расшифровать секрет из базы.
pub fn decrypt_secret(encoded: &str, key: &[u8; 32]) -> anyhow::Result<String> {
    let encrypted = BASE64
        .decode(encoded)
        .map_err(|e| anyhow::anyhow!("Base64 decode failed: {}", e))?;

    if encrypted.len() < NONCE_SIZE + 1 {
        anyhow::bail!("Invalid encrypted data format");
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("Cipher init failed: {}", e))?;

    let nonce = Nonce::from_slice(&encrypted[..NONCE_SIZE]);
    let ciphertext = &encrypted[NONCE_SIZE..];

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| anyhow::anyhow!("Decryption failed: wrong key or corrupted data"))?;

    String::from_utf8(plaintext).map_err(|e| anyhow::anyhow!("Invalid UTF-8: {}", e))
}

/// HMAC-SHA256 подпись тела вебхука, hex.
pub fn compute_webhook_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Проверка подписи вебхука. Сравнение за константное время.
///
/// Принимает подпись как с префиксом `sha256=`, так и без него.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let provided = signature
        .trim()
        .strip_prefix("sha256=")
        .unwrap_or(signature.trim())
        .to_lowercase();
    let computed = compute_webhook_signature(secret, body);
    constant_time_eq(provided.as_bytes(), computed.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        [0x42u8; 32]
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let plaintext = r#"{"api_key":"k-123","client_id":"77"}"#;

        let encrypted = encrypt_secret(plaintext, &key).expect("encryption failed");
        let decrypted = decrypt_secret(&encrypted, &key).expect("decryption failed");

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_random_nonce_produces_distinct_ciphertexts() {
        let key = test_key();
        let enc1 = encrypt_secret("same-secret", &key).unwrap();
        let enc2 = encrypt_secret("same-secret", &key).unwrap();
        assert_ne!(enc1, enc2);
        assert_eq!(
            decrypt_secret(&enc1, &key).unwrap(),
            decrypt_secret(&enc2, &key).unwrap()
        );
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let encrypted = encrypt_secret("secret", &[0x42u8; 32]).unwrap();
        assert!(decrypt_secret(&encrypted, &[0x43u8; 32]).is_err());
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        let key = test_key();
        assert!(decrypt_secret("not-valid-base64!!!", &key).is_err());
        let short = BASE64.encode([0u8; 5]);
        assert!(decrypt_secret(&short, &key).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let key = test_key();
        let encrypted = encrypt_secret("secret", &key).unwrap();
        let mut bytes = BASE64.decode(&encrypted).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = BASE64.encode(&bytes);
        assert!(decrypt_secret(&tampered, &key).is_err());
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        assert_eq!(derive_key(b"passphrase"), derive_key(b"passphrase"));
        assert_ne!(derive_key(b"passphrase"), derive_key(b"other"));
    }

    #[test]
    fn test_signature_is_hex_encoded_sha256() {
        let sig = compute_webhook_signature("secret", b"payload");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_depends_on_secret_and_body() {
        let base = compute_webhook_signature("secret", b"payload");
        assert_ne!(base, compute_webhook_signature("other", b"payload"));
        assert_ne!(base, compute_webhook_signature("secret", b"payload2"));
    }

    #[test]
    fn test_verify_accepts_valid_signature() {
        let sig = compute_webhook_signature("s3cret", b"body");
        assert!(verify_webhook_signature("s3cret", b"body", &sig));
    }

    #[test]
    fn test_verify_accepts_prefixed_signature() {
        let sig = compute_webhook_signature("s3cret", b"body");
        let prefixed = format!("sha256={}", sig);
        assert!(verify_webhook_signature("s3cret", b"body", &prefixed));
    }

    #[test]
    fn test_verify_rejects_forged_signature() {
        assert!(!verify_webhook_signature("s3cret", b"body", "deadbeef"));
        let sig = compute_webhook_signature("s3cret", b"body");
        assert!(!verify_webhook_signature("wrong", b"body", &sig));
    }
}

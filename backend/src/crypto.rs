//! Field-level encryption for free text stored at rest.
//!
//! Each value is sealed with ChaCha20-Poly1305 under the configured key and a
//! fresh random 12-byte nonce. The nonce, ciphertext and detached 16-byte
//! authentication tag are stored hex-encoded as `{iv, content, tag}`.

use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce, Tag};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField {
    pub iv: String,
    pub content: String,
    pub tag: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CryptoError {
    Encrypt,
    Decrypt,
    Malformed(&'static str),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encrypt => write!(f, "Encryption failed"),
            Self::Decrypt => write!(f, "Decryption failed (wrong key or tampered data)"),
            Self::Malformed(part) => write!(f, "Malformed encrypted field: bad {}", part),
        }
    }
}

impl std::error::Error for CryptoError {}

pub struct FieldCipher {
    cipher: ChaCha20Poly1305,
}

impl FieldCipher {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedField, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
            .map_err(|_| CryptoError::Encrypt)?;

        Ok(EncryptedField {
            iv: hex::encode(nonce),
            content: hex::encode(&buffer),
            tag: hex::encode(tag),
        })
    }

    pub fn decrypt(&self, field: &EncryptedField) -> Result<String, CryptoError> {
        let nonce: [u8; NONCE_LEN] = decode_exact(&field.iv, "iv")?;
        let tag: [u8; TAG_LEN] = decode_exact(&field.tag, "tag")?;
        let mut buffer = hex::decode(&field.content).map_err(|_| CryptoError::Malformed("content"))?;

        self.cipher
            .decrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer, Tag::from_slice(&tag))
            .map_err(|_| CryptoError::Decrypt)?;

        String::from_utf8(buffer).map_err(|_| CryptoError::Decrypt)
    }
}

fn decode_exact<const N: usize>(raw: &str, part: &'static str) -> Result<[u8; N], CryptoError> {
    hex::decode(raw)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(CryptoError::Malformed(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(byte: u8) -> FieldCipher {
        FieldCipher::new(&[byte; 32])
    }

    #[test]
    fn test_round_trip() {
        let cipher = cipher(7);
        for text in ["", "Grateful for the sunrise", "emoji ☀️ and ünïcode"] {
            let sealed = cipher.encrypt(text).unwrap();
            assert_eq!(sealed.iv.len(), NONCE_LEN * 2);
            assert_eq!(sealed.tag.len(), TAG_LEN * 2);
            assert_eq!(cipher.decrypt(&sealed).unwrap(), text);
        }
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let cipher = cipher(7);
        let a = cipher.encrypt("same text").unwrap();
        let b = cipher.encrypt("same text").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.content, b.content);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = cipher(1).encrypt("private thoughts").unwrap();
        assert_eq!(cipher(2).decrypt(&sealed), Err(CryptoError::Decrypt));
    }

    #[test]
    fn test_tampering_fails() {
        let cipher = cipher(3);
        let sealed = cipher.encrypt("private thoughts").unwrap();

        let mut content = hex::decode(&sealed.content).unwrap();
        content[0] ^= 0x01;
        let tampered = EncryptedField { content: hex::encode(content), ..sealed.clone() };
        assert_eq!(cipher.decrypt(&tampered), Err(CryptoError::Decrypt));

        let mut tag = hex::decode(&sealed.tag).unwrap();
        tag[15] ^= 0x80;
        let tampered = EncryptedField { tag: hex::encode(tag), ..sealed.clone() };
        assert_eq!(cipher.decrypt(&tampered), Err(CryptoError::Decrypt));
    }

    #[test]
    fn test_malformed_parts_rejected() {
        let cipher = cipher(4);
        let sealed = cipher.encrypt("x").unwrap();
        let short_iv = EncryptedField { iv: "abcd".into(), ..sealed.clone() };
        assert_eq!(cipher.decrypt(&short_iv), Err(CryptoError::Malformed("iv")));
        let bad_hex = EncryptedField { content: "zz".into(), ..sealed };
        assert_eq!(cipher.decrypt(&bad_hex), Err(CryptoError::Malformed("content")));
    }
}

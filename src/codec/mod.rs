//! Tamper-evident encoding of session cookie values.
//!
//! A cookie value is produced by optionally encrypting the payload with
//! AES-256-GCM, base64url-encoding it, authenticating `name|timestamp|value`
//! with HMAC-SHA256, and base64url-encoding the final
//! `timestamp|value|mac` envelope. Decoding walks a chain of key pairs in
//! order, so keys can be rotated without invalidating outstanding cookies:
//! new cookies are signed with the newest pair, old ones stay decodable until
//! they expire naturally.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use sha2::Sha256;

use crate::store::Error;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;

/// Default staleness bound for decoded cookie values: 30 days.
pub const DEFAULT_CODEC_MAX_AGE: i64 = 86400 * 30;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// An authentication key plus an optional 32-byte encryption key.
#[derive(Clone)]
pub struct KeyPair {
    auth: Vec<u8>,
    encryption: Option<[u8; 32]>,
}

impl KeyPair {
    /// Creates a signing-only key pair.
    pub fn signing(auth: &[u8]) -> Self {
        Self {
            auth: auth.to_vec(),
            encryption: None,
        }
    }

    /// Creates a signing + encrypting key pair. The encryption key must be
    /// exactly 32 bytes (AES-256).
    pub fn new(auth: &[u8], encryption: &[u8]) -> Result<Self, Error> {
        let encryption: [u8; 32] = encryption.try_into().map_err(|_| {
            Error::Serialize(format!(
                "encryption key must be 32 bytes, got {}",
                encryption.len()
            ))
        })?;

        Ok(Self {
            auth: auth.to_vec(),
            encryption: Some(encryption),
        })
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("encrypting", &self.encryption.is_some())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    fn mac(&self) -> Result<HmacSha256, Error> {
        <HmacSha256 as Mac>::new_from_slice(&self.auth)
            .map_err(|e| Error::Serialize(format!("invalid authentication key: {e}")))
    }

    fn seal(&self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        let Some(key) = &self.encryption else {
            return Ok(payload.to_vec());
        };

        let cipher = Aes256Gcm::new(key.into());
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, payload)
            .map_err(|e| Error::Serialize(format!("encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, Error> {
        let Some(key) = &self.encryption else {
            return Ok(sealed.to_vec());
        };

        if sealed.len() < NONCE_LEN {
            return Err(Error::Deserialize("sealed payload too short".into()));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(key.into());
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| Error::Deserialize(format!("decryption failed: {e}")))
    }

    fn encode_at(&self, name: &str, payload: &[u8], timestamp: i64) -> Result<String, Error> {
        let sealed = self.seal(payload)?;
        let value = URL_SAFE_NO_PAD.encode(&sealed);

        let mut mac = self.mac()?;
        mac.update(format!("{name}|{timestamp}|{value}").as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(URL_SAFE_NO_PAD.encode(format!("{timestamp}|{value}|{tag}")))
    }

    /// Decodes one envelope under this key pair. `Err(Error::Authentication)`
    /// means the MAC did not verify; `Err(Error::Expired)` means it verified
    /// but the embedded timestamp is older than `max_age` seconds.
    fn decode_at(
        &self,
        name: &str,
        encoded: &str,
        max_age: i64,
        now: i64,
    ) -> Result<Vec<u8>, Error> {
        let outer = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| Error::Authentication)?;
        let outer = String::from_utf8(outer).map_err(|_| Error::Authentication)?;

        let mut parts = outer.splitn(3, '|');
        let (Some(timestamp), Some(value), Some(tag)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Authentication);
        };

        let mut mac = self.mac()?;
        mac.update(format!("{name}|{timestamp}|{value}").as_bytes());
        let tag = URL_SAFE_NO_PAD.decode(tag).map_err(|_| Error::Authentication)?;
        mac.verify_slice(&tag).map_err(|_| Error::Authentication)?;

        let timestamp: i64 = timestamp.parse().map_err(|_| Error::Authentication)?;
        if max_age > 0 && now - timestamp > max_age {
            return Err(Error::Expired);
        }

        let sealed = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| Error::Deserialize(format!("inner base64: {e}")))?;
        self.open(&sealed)
    }
}

/// An ordered chain of key pairs with a staleness bound.
///
/// Encoding always uses the first pair; decoding tries each pair in order.
#[derive(Clone, Debug)]
pub struct KeyChain {
    pairs: Vec<KeyPair>,
    max_age: i64,
}

impl KeyChain {
    pub fn new(pairs: Vec<KeyPair>) -> Self {
        assert!(!pairs.is_empty(), "key chain requires at least one key pair");
        Self {
            pairs,
            max_age: DEFAULT_CODEC_MAX_AGE,
        }
    }

    /// Sets the staleness bound in seconds; `0` disables the check.
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Encodes `payload` into a cookie value bound to the cookie `name`.
    pub fn encode(&self, name: &str, payload: &[u8]) -> Result<String, Error> {
        self.pairs[0].encode_at(name, payload, now_secs())
    }

    /// Decodes a cookie value, trying each key pair in order.
    pub fn decode(&self, name: &str, encoded: &str) -> Result<Vec<u8>, Error> {
        self.decode_at(name, encoded, now_secs())
    }

    pub(crate) fn encode_at(
        &self,
        name: &str,
        payload: &[u8],
        timestamp: i64,
    ) -> Result<String, Error> {
        self.pairs[0].encode_at(name, payload, timestamp)
    }

    pub(crate) fn decode_at(&self, name: &str, encoded: &str, now: i64) -> Result<Vec<u8>, Error> {
        for pair in &self.pairs {
            match pair.decode_at(name, encoded, self.max_age, now) {
                Err(Error::Authentication) => continue,
                other => return other,
            }
        }

        Err(Error::Authentication)
    }
}

/// Process-wide key configuration with rotation support.
///
/// The chain is held as an immutable snapshot behind a lock; [`KeyRing::rotate`]
/// swaps the whole snapshot, so in-flight decodes keep working against the
/// chain they started with.
#[derive(Clone, Debug)]
pub struct KeyRing {
    chain: Arc<RwLock<Arc<KeyChain>>>,
}

impl KeyRing {
    pub fn new(pairs: Vec<KeyPair>) -> Self {
        Self::from_chain(KeyChain::new(pairs))
    }

    pub fn from_chain(chain: KeyChain) -> Self {
        Self {
            chain: Arc::new(RwLock::new(Arc::new(chain))),
        }
    }

    /// Returns the current chain snapshot.
    pub fn current(&self) -> Arc<KeyChain> {
        Arc::clone(&self.chain.read())
    }

    /// Replaces the chain. Put the newest pair first and keep the pairs still
    /// expected in outstanding cookies behind it.
    pub fn rotate(&self, chain: KeyChain) {
        *self.chain.write() = Arc::new(chain);
    }
}

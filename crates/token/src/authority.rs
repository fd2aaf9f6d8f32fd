//! AEAD token issue/validate/renew.
//!
//! Every token gets a fresh random 96-bit nonce, prepended to the
//! ciphertext before hex encoding, so the same identity pair never
//! produces the same token twice. The key comes from the environment and
//! never appears in source.

use aes_gcm::aead::{Aead, AeadCore, OsRng};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use conductor_core::types::{DbId, Timestamp};

/// AES-256-GCM nonce size in bytes.
const NONCE_LEN: usize = 12;

/// Default token lifetime in seconds (one hour).
const DEFAULT_TTL_SECS: i64 = 3600;

/// Configuration for token encryption and lifetime.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// AES-256 key for sealing and opening tokens.
    pub key: [u8; 32],
    /// How long an issued token stays valid.
    pub ttl: chrono::Duration,
}

impl TokenConfig {
    /// Load token configuration from environment variables.
    ///
    /// | Env Var          | Required | Default |
    /// |------------------|----------|---------|
    /// | `TOKEN_KEY`      | **yes**  | --      |
    /// | `TOKEN_TTL_SECS` | no       | `3600`  |
    ///
    /// `TOKEN_KEY` must be 64 hex characters (a 32-byte AES-256 key).
    ///
    /// # Panics
    ///
    /// Panics if `TOKEN_KEY` is missing or not a 32-byte hex string.
    pub fn from_env() -> Self {
        let key_hex = std::env::var("TOKEN_KEY").expect("TOKEN_KEY must be set in the environment");
        let key_bytes = hex::decode(&key_hex).expect("TOKEN_KEY must be a hex string");
        let key: [u8; 32] = key_bytes
            .try_into()
            .expect("TOKEN_KEY must decode to exactly 32 bytes");

        let ttl_secs: i64 = std::env::var("TOKEN_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_TTL_SECS.to_string())
            .parse()
            .expect("TOKEN_TTL_SECS must be a valid i64");

        Self {
            key,
            ttl: chrono::Duration::seconds(ttl_secs),
        }
    }
}

/// The identity pair carried inside a valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenIdentity {
    pub application_id: DbId,
    pub application_instance_id: DbId,
}

/// A freshly issued token together with its expiry.
///
/// `server_time` lets callers on skewed clocks compute the remaining
/// lifetime themselves.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    #[serde(rename = "auth_token")]
    pub token: String,
    pub expires: Timestamp,
    pub server_time: Timestamp,
}

/// Why a token failed validation.
///
/// Handlers collapse every variant to the same unauthorized outcome; the
/// distinction only matters for logs and tests.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    /// Not valid hex, or too short to contain a nonce.
    #[error("Token is not a well-formed hex string")]
    Malformed,

    /// Authenticated decryption failed (wrong key or tampered data).
    #[error("Token failed authenticated decryption")]
    Decryption,

    /// Decryption succeeded but the plaintext is not `id|id|timestamp`.
    #[error("Token plaintext has an unexpected shape")]
    BadPlaintext,

    /// Structurally valid, but the embedded expiry is not in the future.
    #[error("Token has expired")]
    Expired,
}

/// Issues and validates bearer tokens under one process-wide key.
#[derive(Clone)]
pub struct TokenAuthority {
    cipher: Aes256Gcm,
    ttl: chrono::Duration,
}

impl TokenAuthority {
    pub fn new(config: &TokenConfig) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&config.key);
        Self {
            cipher: Aes256Gcm::new(key),
            ttl: config.ttl,
        }
    }

    /// Issue a token for the given identity pair, valid for the
    /// configured TTL.
    pub fn issue(&self, application_id: DbId, application_instance_id: DbId) -> IssuedToken {
        let now = Utc::now();
        let expires = now + self.ttl;
        let plaintext = format!(
            "{application_id}|{application_instance_id}|{}",
            expires.to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        // Encryption with a valid key and nonce cannot fail for AES-GCM.
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .expect("AES-GCM encryption is infallible for well-formed inputs");

        let mut wire = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        wire.extend_from_slice(&nonce);
        wire.extend_from_slice(&ciphertext);

        IssuedToken {
            token: hex::encode(wire),
            expires,
            server_time: now,
        }
    }

    /// Validate a token: authenticated decryption must succeed and the
    /// embedded expiry must be strictly in the future.
    pub fn validate(&self, token: &str) -> Result<TokenIdentity, TokenError> {
        let (identity, expires) = self.open(token)?;
        if expires <= Utc::now() {
            return Err(TokenError::Expired);
        }
        Ok(identity)
    }

    /// Exchange a still-valid token for a fresh one with a full TTL.
    ///
    /// Renewal applies the same strict expiry check as [`validate`]; an
    /// expired token cannot be used to mint a new one.
    ///
    /// [`validate`]: TokenAuthority::validate
    pub fn renew(&self, token: &str) -> Result<IssuedToken, TokenError> {
        let identity = self.validate(token)?;
        Ok(self.issue(identity.application_id, identity.application_instance_id))
    }

    /// Decrypt and parse a token without checking its expiry.
    fn open(&self, token: &str) -> Result<(TokenIdentity, DateTime<Utc>), TokenError> {
        let wire = hex::decode(token).map_err(|_| TokenError::Malformed)?;
        if wire.len() <= NONCE_LEN {
            return Err(TokenError::Malformed);
        }
        let (nonce, ciphertext) = wire.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| TokenError::Decryption)?;
        let plaintext = String::from_utf8(plaintext).map_err(|_| TokenError::BadPlaintext)?;

        let mut fields = plaintext.splitn(3, '|');
        let application_id = fields
            .next()
            .and_then(|f| f.parse::<DbId>().ok())
            .ok_or(TokenError::BadPlaintext)?;
        let application_instance_id = fields
            .next()
            .and_then(|f| f.parse::<DbId>().ok())
            .ok_or(TokenError::BadPlaintext)?;
        let expires = fields
            .next()
            .and_then(|f| DateTime::parse_from_rfc3339(f).ok())
            .ok_or(TokenError::BadPlaintext)?
            .with_timezone(&Utc);

        Ok((
            TokenIdentity {
                application_id,
                application_instance_id,
            },
            expires,
        ))
    }
}

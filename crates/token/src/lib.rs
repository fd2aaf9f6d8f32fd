//! Token authority: opaque AEAD bearer tokens and credential login.
//!
//! A token is `hex(nonce || ciphertext)` of the UTF-8 string
//! `"<application_id>|<application_instance_id>|<RFC3339 expiry>"`,
//! encrypted with AES-256-GCM under a process-wide key. Validation is
//! stateless; tokens cannot be revoked before they expire, which is why
//! the TTL is short.

pub mod authority;
pub mod login;

pub use authority::{IssuedToken, TokenAuthority, TokenConfig, TokenError, TokenIdentity};

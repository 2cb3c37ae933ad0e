//! Token generation for brand API keys and customer license keys.
//!
//! Tokens carry a type prefix so the entity is recognizable from the token alone:
//!
//! - Brand API key: `br_{48 lowercase hex}` (24 random bytes)
//! - License key: `lk_{32 url-safe base64}` (24 random bytes, no padding)
//!
//! Both draw from the OS RNG. Uniqueness is ultimately enforced by the store's
//! UNIQUE constraints; a collision surfaces as a constraint violation there.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Random bytes per token (192 bits).
const TOKEN_BYTES: usize = 24;

/// Characters of a brand API key kept in clear for display and support lookups.
pub const API_KEY_DISPLAY_PREFIX_LEN: usize = 11;

/// Token kinds issued by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    BrandApiKey,
    LicenseKey,
}

impl TokenKind {
    /// Returns the prefix for this token kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::BrandApiKey => "br_",
            Self::LicenseKey => "lk_",
        }
    }

    /// Length of the encoded random part.
    fn body_len(&self) -> usize {
        match self {
            Self::BrandApiKey => TOKEN_BYTES * 2,
            Self::LicenseKey => TOKEN_BYTES.div_ceil(3) * 4,
        }
    }

    fn body_char_ok(&self, c: char) -> bool {
        match self {
            Self::BrandApiKey => c.is_ascii_digit() || ('a'..='f').contains(&c),
            Self::LicenseKey => c.is_ascii_alphanumeric() || c == '-' || c == '_',
        }
    }

    /// Generates a new token of this kind.
    pub fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let body = match self {
            Self::BrandApiKey => hex::encode(bytes),
            Self::LicenseKey => URL_SAFE_NO_PAD.encode(bytes),
        };
        format!("{}{}", self.prefix(), body)
    }

    /// Cheap shape check to reject garbage before hitting the database.
    pub fn is_well_formed(&self, token: &str) -> bool {
        let Some(body) = token.strip_prefix(self.prefix()) else {
            return false;
        };
        body.len() == self.body_len() && body.chars().all(|c| self.body_char_ok(c))
    }
}

pub fn generate_brand_key() -> String {
    TokenKind::BrandApiKey.generate()
}

pub fn generate_license_key() -> String {
    TokenKind::LicenseKey.generate()
}

/// SHA-256 digest used to store brand API keys at rest.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"license-hub-v1:");
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Visible part of an API key (e.g. `br_3fa94c0e`).
pub fn api_key_display_prefix(api_key: &str) -> &str {
    api_key.get(..API_KEY_DISPLAY_PREFIX_LEN).unwrap_or(api_key)
}

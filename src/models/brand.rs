use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A tenant selling one or more products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: String,
    pub name: String,
    /// Visible part of the API key (e.g. `br_3fa94c0e`)
    pub api_key_prefix: String,
    #[serde(skip_serializing)]
    pub api_key_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateBrand {
    pub name: String,
}

impl CreateBrand {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::bad_request("Brand name cannot be empty"));
        }
        if self.name.len() > 255 {
            return Err(AppError::bad_request("Brand name must be at most 255 characters"));
        }
        Ok(())
    }
}

/// Returned once when a brand is created; the plaintext key is never stored.
#[derive(Debug, Serialize)]
pub struct BrandCreated {
    pub brand: Brand,
    pub api_key: String,
}

/// Who is calling, as resolved from the `X-API-Key` header.
///
/// Passed explicitly into every service operation. An unknown key never
/// produces a `Caller`; it is rejected before any operation runs.
#[derive(Debug, Clone)]
pub enum Caller {
    Anonymous,
    Brand(Brand),
}

impl Caller {
    pub fn brand(&self) -> Option<&Brand> {
        match self {
            Caller::Anonymous => None,
            Caller::Brand(brand) => Some(brand),
        }
    }

    /// The caller's brand, or `Unauthorized` for anonymous callers.
    pub fn require_brand(&self) -> Result<&Brand> {
        self.brand().ok_or(AppError::Unauthorized)
    }
}

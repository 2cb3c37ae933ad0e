use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};

/// Basic email format validation.
///
/// Validates that email has:
/// - Exactly one @ symbol
/// - Non-empty local part (before @) without spaces
/// - Non-empty domain part (after @) with at least one dot
///
/// Not RFC 5322; just enough to keep obvious garbage out of the key table.
pub fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
    }

    let Some((local_part, domain_part)) = email.split_once('@') else {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    };

    if local_part.is_empty() || local_part.contains(' ') || domain_part.contains('@') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain_part.is_empty() || !domain_part.contains('.') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain_part.starts_with('.') || domain_part.ends_with('.') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    Ok(())
}

/// Customer-facing token bundling one or more product licenses.
/// At most one per (brand, customer_email).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseKey {
    pub id: String,
    pub brand_id: String,
    pub customer_email: String,
    pub key: String,
    pub created_at: i64,
}

/// A license key joined with its owning brand's name.
#[derive(Debug, Clone)]
pub struct LicenseKeyWithBrand {
    pub license_key: LicenseKey,
    pub brand_name: String,
}

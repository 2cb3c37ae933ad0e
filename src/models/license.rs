use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::lifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LicenseStatus {
    Valid,
    Suspended,
    /// Terminal: no transition leaves this state.
    Cancelled,
}

/// Entitlement for one product under one license key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    pub license_key_id: String,
    pub product_id: String,
    pub status: LicenseStatus,
    pub expires_at: i64,
    pub created_at: i64,
}

impl License {
    /// Valid and unexpired at `now`. Always recomputed, never stored.
    pub fn is_active_at(&self, now: i64) -> bool {
        lifecycle::is_active(self.status, self.expires_at, now)
    }
}

/// A license joined with its product code.
#[derive(Debug, Clone)]
pub struct LicenseWithProduct {
    pub license: License,
    pub product_code: String,
}

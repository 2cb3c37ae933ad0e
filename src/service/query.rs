use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::error::{OptionExt, Result, msg};
use crate::models::{Caller, LicenseStatus, validate_email_format};

use super::{LicenseSummary, require_field, run_read, to_datetime, validate_license_key};

#[derive(Debug, Clone, Deserialize)]
pub struct CheckQuery {
    pub license_key: String,
}

#[derive(Debug, Serialize)]
pub struct LicenseReport {
    pub product: String,
    pub status: LicenseStatus,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub is_activated: bool,
    pub active_instances: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub license_key: String,
    pub brand: String,
    pub customer_email: String,
    pub licenses: Vec<LicenseReport>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ByEmailQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct BrandLicenses {
    pub brand: String,
    pub license_key: String,
    pub licenses: Vec<LicenseSummary>,
}

#[derive(Debug, Serialize)]
pub struct ByEmailResponse {
    pub email: String,
    pub results: Vec<BrandLicenses>,
}

/// Report every license on a key with its live instances. Read-only.
///
/// `is_active` is computed at call time; `is_activated` is reported
/// independently of it.
pub fn check_license_key(conn: &mut Connection, query: &CheckQuery) -> Result<CheckResponse> {
    let key = validate_license_key(&query.license_key)?;

    run_read(conn, |tx| {
        let found = queries::get_license_key_with_brand(tx, key)?
            .or_not_found(msg::LICENSE_KEY_NOT_FOUND)?;
        let now = queries::now();

        let mut licenses = Vec::new();
        for entry in queries::list_licenses_for_key(tx, &found.license_key.id)? {
            let active_instances = queries::list_live_instance_ids(tx, &entry.license.id)?;
            licenses.push(LicenseReport {
                is_active: entry.license.is_active_at(now),
                is_activated: !active_instances.is_empty(),
                active_instances,
                product: entry.product_code,
                status: entry.license.status,
                expires_at: to_datetime(entry.license.expires_at),
            });
        }

        Ok(CheckResponse {
            license_key: found.license_key.key,
            brand: found.brand_name,
            customer_email: found.license_key.customer_email,
            licenses,
        })
    })
}

/// Every brand's license keys for a customer email. Requires a brand caller,
/// but results are not limited to the caller's brand.
pub fn list_by_email(
    conn: &mut Connection,
    caller: &Caller,
    query: &ByEmailQuery,
) -> Result<ByEmailResponse> {
    let brand = caller.require_brand()?;
    let email = require_field(&query.email, "email")?;
    validate_email_format(email)?;

    run_read(conn, |tx| {
        let mut results = Vec::new();
        for found in queries::list_license_keys_by_email(tx, email)? {
            let licenses = queries::list_licenses_for_key(tx, &found.license_key.id)?
                .into_iter()
                .map(|entry| LicenseSummary::new(entry.product_code, &entry.license))
                .collect();
            results.push(BrandLicenses {
                brand: found.brand_name,
                license_key: found.license_key.key,
                licenses,
            });
        }

        tracing::debug!(caller = %brand.name, keys = results.len(), "Listed license keys by email");

        Ok(ByEmailResponse {
            email: email.to_string(),
            results,
        })
    })
}

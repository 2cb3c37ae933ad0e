use std::collections::HashSet;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::error::{AppError, Result, msg};
use crate::models::{Caller, validate_email_format};

use super::{LicenseSummary, require_field, run_in_transaction};

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionRequest {
    pub customer_email: String,
    pub product_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    pub license_key: String,
    pub brand: String,
    pub customer_email: String,
    pub licenses: Vec<LicenseSummary>,
}

/// Trimmed, non-empty, duplicate-free product codes in request order.
fn validate_product_codes(codes: &[String]) -> Result<Vec<&str>> {
    if codes.is_empty() {
        return Err(AppError::BadRequest(msg::PRODUCT_CODES_EMPTY.into()));
    }
    let mut seen = HashSet::with_capacity(codes.len());
    let mut validated = Vec::with_capacity(codes.len());
    for code in codes {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::BadRequest(msg::PRODUCT_CODE_EMPTY.into()));
        }
        if !seen.insert(code) {
            return Err(AppError::BadRequest(msg::DUPLICATE_PRODUCTS.into()));
        }
        validated.push(code);
    }
    Ok(validated)
}

/// Issue (or reuse) the caller brand's license key for a customer and make
/// sure it carries a license for each requested product.
///
/// All product codes are resolved before anything is written; one unknown
/// code fails the whole call. Existing licenses are returned untouched.
pub fn provision(
    conn: &mut Connection,
    caller: &Caller,
    req: &ProvisionRequest,
) -> Result<ProvisionResponse> {
    let brand = caller.require_brand()?;
    let customer_email = require_field(&req.customer_email, "customer_email")?;
    validate_email_format(customer_email)?;
    let codes = validate_product_codes(&req.product_codes)?;

    run_in_transaction(conn, |tx| {
        let products = queries::get_products_by_codes(tx, &brand.id, &codes)?;
        if products.len() != codes.len() {
            let mut missing: Vec<&str> = codes
                .iter()
                .copied()
                .filter(|code| !products.iter().any(|p| p.code == *code))
                .collect();
            missing.sort_unstable();
            return Err(AppError::BadRequest(format!(
                "{}: {}",
                msg::UNKNOWN_PRODUCTS,
                missing.join(", ")
            )));
        }

        let (license_key, key_created) =
            queries::find_or_create_license_key(tx, &brand.id, customer_email)?;

        let mut licenses = Vec::with_capacity(codes.len());
        let mut created_count = 0;
        for code in &codes {
            let Some(product) = products.iter().find(|p| p.code == *code) else {
                continue;
            };
            let (license, created) = queries::find_or_create_license(tx, &license_key.id, &product.id)?;
            if created {
                created_count += 1;
            }
            licenses.push(LicenseSummary::new(&product.code, &license));
        }

        if key_created || created_count > 0 {
            tracing::info!(
                brand = %brand.name,
                key_created,
                licenses_created = created_count,
                "Provisioned license key"
            );
        } else {
            tracing::debug!(brand = %brand.name, "Provision was a no-op, all licenses exist");
        }

        Ok(ProvisionResponse {
            license_key: license_key.key,
            brand: brand.name.clone(),
            customer_email: license_key.customer_email,
            licenses,
        })
    })
}

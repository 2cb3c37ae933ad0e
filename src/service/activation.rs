use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::error::{AppError, OptionExt, Result, msg};
use crate::models::ActivationOutcome;

use super::{
    load_license_key, require_field, run_in_transaction, to_datetime, validate_instance_id,
    validate_license_key,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ActivateRequest {
    pub license_key: String,
    pub instance_id: String,
}

#[derive(Debug, Serialize)]
pub struct ActivatedProduct {
    pub product: String,
    pub instance_id: String,
}

#[derive(Debug, Serialize)]
pub struct ActivateResponse {
    pub license_key: String,
    pub customer_email: String,
    pub activated: Vec<ActivatedProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeactivateRequest {
    pub license_key: String,
    pub product_code: String,
    pub instance_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    pub license_key: String,
    pub product: String,
    pub instance_id: String,
    /// False when there was no live activation to revoke.
    pub deactivated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    /// Set only on the no-op outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Bind `instance_id` to one license, creating the activation or clearing a
/// previous revocation. A live activation is left as is.
pub fn activate_instance(
    conn: &Connection,
    license_id: &str,
    instance_id: &str,
) -> Result<ActivationOutcome> {
    let (activation, created) = queries::find_or_create_activation(conn, license_id, instance_id)?;
    if created {
        return Ok(ActivationOutcome::Created);
    }
    if queries::clear_activation_revocation(conn, &activation.id)? {
        Ok(ActivationOutcome::Reactivated)
    } else {
        Ok(ActivationOutcome::AlreadyActive)
    }
}

/// Activate an instance against every currently active license on a key.
///
/// Fails with `Forbidden` when the key has no active license; in that case
/// nothing is written.
pub fn activate(conn: &mut Connection, req: &ActivateRequest) -> Result<ActivateResponse> {
    let key = require_field(&req.license_key, "license_key")?;
    let instance_id = validate_instance_id(&req.instance_id)?;
    let key = validate_license_key(key)?;

    run_in_transaction(conn, |tx| {
        let license_key = load_license_key(tx, key)?;
        let now = queries::now();
        let active: Vec<_> = queries::list_licenses_for_key(tx, &license_key.id)?
            .into_iter()
            .filter(|l| l.license.is_active_at(now))
            .collect();

        if active.is_empty() {
            return Err(AppError::Forbidden(msg::NO_ACTIVE_LICENSES.into()));
        }

        let mut activated = Vec::with_capacity(active.len());
        for entry in &active {
            let outcome = activate_instance(tx, &entry.license.id, instance_id)?;
            match outcome {
                ActivationOutcome::AlreadyActive => {
                    tracing::debug!(product = %entry.product_code, "Instance already active");
                }
                _ => {
                    tracing::info!(product = %entry.product_code, ?outcome, "Activated instance");
                }
            }
            activated.push(ActivatedProduct {
                product: entry.product_code.clone(),
                instance_id: instance_id.to_string(),
            });
        }

        Ok(ActivateResponse {
            license_key: license_key.key,
            customer_email: license_key.customer_email,
            activated,
        })
    })
}

/// Revoke one product's live activation for an instance.
///
/// Safe to repeat: with nothing live to revoke the call succeeds with
/// `deactivated: false`. License status is never touched.
pub fn deactivate(conn: &mut Connection, req: &DeactivateRequest) -> Result<DeactivateResponse> {
    let key = require_field(&req.license_key, "license_key")?;
    let product_code = require_field(&req.product_code, "product_code")?;
    let instance_id = validate_instance_id(&req.instance_id)?;
    let key = validate_license_key(key)?;

    run_in_transaction(conn, |tx| {
        let license_key = load_license_key(tx, key)?;
        let license = queries::get_license_by_product_code(tx, &license_key.id, product_code)?
            .or_not_found(msg::LICENSE_NOT_FOUND_FOR_PRODUCT)?;

        let now = queries::now();
        let deactivated = queries::revoke_live_activation(tx, &license.license.id, instance_id, now)?;
        if deactivated {
            tracing::info!(product = %license.product_code, "Deactivated instance");
        } else {
            tracing::debug!(product = %license.product_code, "{}", msg::NO_ACTIVE_ACTIVATION);
        }

        Ok(DeactivateResponse {
            license_key: license_key.key,
            product: license.product_code,
            instance_id: instance_id.to_string(),
            deactivated,
            revoked_at: deactivated.then(|| to_datetime(now)),
            detail: (!deactivated).then(|| msg::NO_ACTIVE_ACTIVATION.to_string()),
        })
    })
}

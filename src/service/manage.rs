use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::queries;
use crate::error::{OptionExt, Result, msg};
use crate::lifecycle::{self, LicenseAction, LicenseState};
use crate::models::{Caller, LicenseStatus};

use super::{require_field, run_in_transaction, to_datetime, validate_license_key};

#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleRequest {
    pub license_key: String,
    pub product_code: String,
    pub action: String,
    /// Integer or integer string; only read for `renew`.
    #[serde(default)]
    pub extend_days: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct LifecycleResponse {
    pub license_key: String,
    pub brand: String,
    pub product: String,
    pub status: LicenseStatus,
    pub expires_at: DateTime<Utc>,
}

/// Apply suspend/resume/cancel/renew to one product license on a key owned
/// by the caller's brand.
///
/// Keys of other brands are reported as not found. The key and license are
/// looked up before the action is parsed, so a missing license wins over a
/// bad action.
pub fn apply_lifecycle(
    conn: &mut Connection,
    caller: &Caller,
    req: &LifecycleRequest,
) -> Result<LifecycleResponse> {
    let brand = caller.require_brand()?;
    let key = require_field(&req.license_key, "license_key")?;
    let product_code = require_field(&req.product_code, "product_code")?;
    let action_name = require_field(&req.action, "action")?;
    let key = validate_license_key(key)?;

    run_in_transaction(conn, |tx| {
        let license_key = queries::get_license_key_for_brand(tx, &brand.id, key)?
            .or_not_found(msg::LICENSE_KEY_NOT_FOUND)?;
        let entry = queries::get_license_by_product_code(tx, &license_key.id, product_code)?
            .or_not_found(msg::LICENSE_NOT_FOUND_FOR_PRODUCT)?;
        let action = LicenseAction::parse(action_name, req.extend_days.as_ref())?;

        let current = LicenseState {
            status: entry.license.status,
            expires_at: entry.license.expires_at,
        };
        let transition = lifecycle::apply(current, action, queries::now());

        if transition.changed {
            queries::update_license_state(
                tx,
                &entry.license.id,
                transition.state.status,
                transition.state.expires_at,
            )?;
            tracing::info!(
                brand = %brand.name,
                product = %entry.product_code,
                action = action.name(),
                from = current.status.as_ref(),
                to = transition.state.status.as_ref(),
                "License lifecycle transition"
            );
        } else {
            tracing::debug!(
                brand = %brand.name,
                product = %entry.product_code,
                action = action.name(),
                status = current.status.as_ref(),
                "Lifecycle action left license unchanged"
            );
        }

        Ok(LifecycleResponse {
            license_key: license_key.key,
            brand: brand.name.clone(),
            product: entry.product_code,
            status: transition.state.status,
            expires_at: to_datetime(transition.state.expires_at),
        })
    })
}

//! License provisioning and query operations.
//!
//! Each operation is a plain function of (connection, caller, validated input)
//! returning a response projection or a typed `AppError`. Every operation runs
//! inside a single store transaction so a failure part-way leaves nothing behind.

mod activation;
mod admin;
mod manage;
mod provision;
mod query;

pub use activation::*;
pub use admin::*;
pub use manage::*;
pub use provision::*;
pub use query::*;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db::queries;
use crate::error::{AppError, OptionExt, Result, msg};
use crate::keys::TokenKind;
use crate::models::{License, LicenseKey, LicenseStatus};

/// Longest accepted `instance_id`, in characters.
pub const MAX_INSTANCE_ID_LEN: usize = 255;

/// Run `op` inside an IMMEDIATE transaction, retrying once on `StoreConflict`.
///
/// The write lock is taken up front, so concurrent transitions on the same
/// rows are applied one after another. Any error rolls the transaction back.
pub fn run_in_transaction<T>(
    conn: &mut Connection,
    mut op: impl FnMut(&Connection) -> Result<T>,
) -> Result<T> {
    match transact(conn, TransactionBehavior::Immediate, &mut op) {
        Err(AppError::StoreConflict(reason)) => {
            tracing::warn!(%reason, "Store conflict, retrying transaction once");
            transact(conn, TransactionBehavior::Immediate, &mut op)
        }
        result => result,
    }
}

/// Run a read-only `op` against one consistent snapshot.
pub fn run_read<T>(conn: &mut Connection, mut op: impl FnMut(&Connection) -> Result<T>) -> Result<T> {
    transact(conn, TransactionBehavior::Deferred, &mut op)
}

fn transact<T>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    op: &mut impl FnMut(&Connection) -> Result<T>,
) -> Result<T> {
    let tx = conn.transaction_with_behavior(behavior)?;
    let value = op(&*tx)?;
    tx.commit()?;
    Ok(value)
}

/// Unix seconds to a UTC timestamp for responses.
pub fn to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

/// Trimmed value of a required string field.
pub(crate) fn require_field<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(value)
}

pub(crate) fn validate_instance_id(instance_id: &str) -> Result<&str> {
    let instance_id = require_field(instance_id, "instance_id")?;
    if instance_id.chars().count() > MAX_INSTANCE_ID_LEN {
        return Err(AppError::BadRequest(msg::INSTANCE_ID_TOO_LONG.into()));
    }
    Ok(instance_id)
}

/// Validated license key string. Anything that cannot be a generated key is
/// reported as not found without a store lookup.
pub(crate) fn validate_license_key(license_key: &str) -> Result<&str> {
    let license_key = require_field(license_key, "license_key")?;
    if !TokenKind::LicenseKey.is_well_formed(license_key) {
        return Err(AppError::NotFound(msg::LICENSE_KEY_NOT_FOUND.into()));
    }
    Ok(license_key)
}

/// Look up a license key by its token.
pub(crate) fn load_license_key(conn: &Connection, license_key: &str) -> Result<LicenseKey> {
    queries::get_license_key_by_key(conn, license_key)?.or_not_found(msg::LICENSE_KEY_NOT_FOUND)
}

/// Per-product status and expiry snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseSummary {
    pub product: String,
    pub status: LicenseStatus,
    pub expires_at: DateTime<Utc>,
}

impl LicenseSummary {
    pub fn new(product: impl Into<String>, license: &License) -> Self {
        Self {
            product: product.into(),
            status: license.status,
            expires_at: to_datetime(license.expires_at),
        }
    }
}

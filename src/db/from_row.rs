//! Row mapping trait and helpers for reducing boilerplate in queries.
//!
//! Models implement `FromRow` to define how they are built from a row;
//! `query_one` and `query_all` cover the common single/multi-row patterns.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors
/// instead of panicking on unexpected values.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const BRAND_COLS: &str = "id, name, api_key_prefix, api_key_hash, created_at";

pub const PRODUCT_COLS: &str = "id, brand_id, code, name, created_at";

pub const LICENSE_KEY_COLS: &str = "id, brand_id, customer_email, key, created_at";

/// License key columns prefixed for `license_keys k JOIN brands b`, plus the brand name.
pub const LICENSE_KEY_WITH_BRAND_COLS: &str =
    "k.id, k.brand_id, k.customer_email, k.key, k.created_at, b.name";

pub const LICENSE_COLS: &str = "id, license_key_id, product_id, status, expires_at, created_at";

/// License columns prefixed for `licenses l JOIN products p`, plus the product code.
pub const LICENSE_WITH_PRODUCT_COLS: &str =
    "l.id, l.license_key_id, l.product_id, l.status, l.expires_at, l.created_at, p.code";

pub const ACTIVATION_COLS: &str = "id, license_id, instance_id, created_at, revoked_at";

// ============ FromRow Implementations ============

impl FromRow for Brand {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Brand {
            id: row.get(0)?,
            name: row.get(1)?,
            api_key_prefix: row.get(2)?,
            api_key_hash: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl FromRow for Product {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Product {
            id: row.get(0)?,
            brand_id: row.get(1)?,
            code: row.get(2)?,
            name: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl FromRow for LicenseKey {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(LicenseKey {
            id: row.get(0)?,
            brand_id: row.get(1)?,
            customer_email: row.get(2)?,
            key: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl FromRow for LicenseKeyWithBrand {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(LicenseKeyWithBrand {
            license_key: LicenseKey::from_row(row)?,
            brand_name: row.get(5)?,
        })
    }
}

impl FromRow for License {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(License {
            id: row.get(0)?,
            license_key_id: row.get(1)?,
            product_id: row.get(2)?,
            status: parse_enum(row, 3, "status")?,
            expires_at: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for LicenseWithProduct {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(LicenseWithProduct {
            license: License::from_row(row)?,
            product_code: row.get(6)?,
        })
    }
}

impl FromRow for Activation {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Activation {
            id: row.get(0)?,
            license_id: row.get(1)?,
            instance_id: row.get(2)?,
            created_at: row.get(3)?,
            revoked_at: row.get(4)?,
        })
    }
}

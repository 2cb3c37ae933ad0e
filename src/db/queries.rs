use chrono::Utc;
use rusqlite::{Connection, ErrorCode, ToSql, params};
use uuid::Uuid;

use crate::error::{AppError, Result, msg};
use crate::keys::{api_key_display_prefix, generate_brand_key, generate_license_key, hash_api_key};
use crate::lifecycle;
use crate::models::*;

use super::from_row::{
    ACTIVATION_COLS, BRAND_COLS, LICENSE_COLS, LICENSE_KEY_COLS, LICENSE_KEY_WITH_BRAND_COLS,
    LICENSE_WITH_PRODUCT_COLS, PRODUCT_COLS, query_all, query_one,
};

pub fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Attempts `find_or_create` makes before giving up with `StoreConflict`.
pub const FIND_OR_CREATE_ATTEMPTS: usize = 3;

/// UNIQUE or PRIMARY KEY constraint failure.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

pub fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// Returns the row `find` sees, or the one `create` inserts.
///
/// A UNIQUE violation from `create` means another writer got there first:
/// re-read and return theirs. After `FIND_OR_CREATE_ATTEMPTS` lost races the
/// call fails with `StoreConflict`. The bool is true when this call inserted.
pub fn find_or_create<T>(
    conn: &Connection,
    what: &str,
    mut find: impl FnMut(&Connection) -> Result<Option<T>>,
    mut create: impl FnMut(&Connection) -> Result<T>,
) -> Result<(T, bool)> {
    for attempt in 1..=FIND_OR_CREATE_ATTEMPTS {
        if let Some(existing) = find(conn)? {
            return Ok((existing, false));
        }
        match create(conn) {
            Ok(created) => return Ok((created, true)),
            Err(AppError::Database(e)) if is_unique_violation(&e) => {
                tracing::debug!(what, attempt, "Insert lost a uniqueness race, re-reading");
            }
            Err(e) => return Err(e),
        }
    }
    Err(AppError::StoreConflict(format!(
        "{} could not be found or created after {} attempts",
        what, FIND_OR_CREATE_ATTEMPTS
    )))
}

// ============ Brands ============

/// Create a brand with a fresh API key. Returns the brand and the plaintext key,
/// which is not recoverable afterwards.
pub fn create_brand(conn: &Connection, input: &CreateBrand) -> Result<(Brand, String)> {
    let name = input.name.trim();
    if get_brand_by_name(conn, name)?.is_some() {
        return Err(AppError::Conflict(msg::BRAND_NAME_TAKEN.into()));
    }

    let api_key = generate_brand_key();
    let brand = Brand {
        id: gen_id(),
        name: name.to_string(),
        api_key_prefix: api_key_display_prefix(&api_key).to_string(),
        api_key_hash: hash_api_key(&api_key),
        created_at: now(),
    };

    conn.execute(
        "INSERT INTO brands (id, name, api_key_prefix, api_key_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &brand.id,
            &brand.name,
            &brand.api_key_prefix,
            &brand.api_key_hash,
            brand.created_at
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::StoreConflict(format!("brand insert: {}", e))
        } else {
            e.into()
        }
    })?;

    Ok((brand, api_key))
}

pub fn get_brand_by_id(conn: &Connection, id: &str) -> Result<Option<Brand>> {
    query_one(
        conn,
        &format!("SELECT {} FROM brands WHERE id = ?1", BRAND_COLS),
        &[&id],
    )
}

pub fn get_brand_by_name(conn: &Connection, name: &str) -> Result<Option<Brand>> {
    query_one(
        conn,
        &format!("SELECT {} FROM brands WHERE name = ?1", BRAND_COLS),
        &[&name],
    )
}

/// Resolve a plaintext API key to its brand.
pub fn get_brand_by_api_key(conn: &Connection, api_key: &str) -> Result<Option<Brand>> {
    let hash = hash_api_key(api_key);
    query_one(
        conn,
        &format!("SELECT {} FROM brands WHERE api_key_hash = ?1", BRAND_COLS),
        &[&hash],
    )
}

pub fn list_brands(conn: &Connection) -> Result<Vec<Brand>> {
    query_all(
        conn,
        &format!("SELECT {} FROM brands ORDER BY name", BRAND_COLS),
        &[],
    )
}

/// Delete a brand and, by cascade, its license keys. Refused while products exist.
pub fn delete_brand(conn: &Connection, id: &str) -> Result<bool> {
    match conn.execute("DELETE FROM brands WHERE id = ?1", params![id]) {
        Ok(deleted) => Ok(deleted > 0),
        Err(e) if is_foreign_key_violation(&e) => {
            Err(AppError::Conflict(msg::BRAND_HAS_PRODUCTS.into()))
        }
        Err(e) => Err(e.into()),
    }
}

// ============ Products ============

pub fn create_product(conn: &Connection, brand_id: &str, input: &CreateProduct) -> Result<Product> {
    let product = Product {
        id: gen_id(),
        brand_id: brand_id.to_string(),
        code: input.code.trim().to_string(),
        name: input.name.trim().to_string(),
        created_at: now(),
    };

    conn.execute(
        "INSERT INTO products (id, brand_id, code, name, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &product.id,
            &product.brand_id,
            &product.code,
            &product.name,
            product.created_at
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(msg::PRODUCT_CODE_TAKEN.into())
        } else {
            e.into()
        }
    })?;

    Ok(product)
}

pub fn get_product_by_code(conn: &Connection, brand_id: &str, code: &str) -> Result<Option<Product>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM products WHERE brand_id = ?1 AND code = ?2",
            PRODUCT_COLS
        ),
        &[&brand_id, &code],
    )
}

/// Products of `brand_id` whose code is in `codes`. Unknown codes are simply absent.
pub fn get_products_by_codes(
    conn: &Connection,
    brand_id: &str,
    codes: &[&str],
) -> Result<Vec<Product>> {
    if codes.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders: Vec<String> = (2..=codes.len() + 1).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT {} FROM products WHERE brand_id = ?1 AND code IN ({})",
        PRODUCT_COLS,
        placeholders.join(", ")
    );
    let mut params: Vec<&dyn ToSql> = Vec::with_capacity(codes.len() + 1);
    params.push(&brand_id);
    params.extend(codes.iter().map(|code| code as &dyn ToSql));
    query_all(conn, &sql, &params)
}

pub fn list_products_for_brand(conn: &Connection, brand_id: &str) -> Result<Vec<Product>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM products WHERE brand_id = ?1 ORDER BY code",
            PRODUCT_COLS
        ),
        &[&brand_id],
    )
}

/// Refused while any license references the product.
pub fn delete_product(conn: &Connection, id: &str) -> Result<bool> {
    match conn.execute("DELETE FROM products WHERE id = ?1", params![id]) {
        Ok(deleted) => Ok(deleted > 0),
        Err(e) if is_foreign_key_violation(&e) => {
            Err(AppError::Conflict(msg::PRODUCT_HAS_LICENSES.into()))
        }
        Err(e) => Err(e.into()),
    }
}

// ============ License Keys ============

pub fn get_license_key_by_key(conn: &Connection, key: &str) -> Result<Option<LicenseKey>> {
    query_one(
        conn,
        &format!("SELECT {} FROM license_keys WHERE key = ?1", LICENSE_KEY_COLS),
        &[&key],
    )
}

pub fn get_license_key_with_brand(
    conn: &Connection,
    key: &str,
) -> Result<Option<LicenseKeyWithBrand>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM license_keys k JOIN brands b ON b.id = k.brand_id WHERE k.key = ?1",
            LICENSE_KEY_WITH_BRAND_COLS
        ),
        &[&key],
    )
}

/// Lookup scoped to one brand: another brand's key is indistinguishable from a missing one.
pub fn get_license_key_for_brand(
    conn: &Connection,
    brand_id: &str,
    key: &str,
) -> Result<Option<LicenseKey>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM license_keys WHERE brand_id = ?1 AND key = ?2",
            LICENSE_KEY_COLS
        ),
        &[&brand_id, &key],
    )
}

pub fn get_license_key_by_brand_email(
    conn: &Connection,
    brand_id: &str,
    customer_email: &str,
) -> Result<Option<LicenseKey>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM license_keys WHERE brand_id = ?1 AND customer_email = ?2",
            LICENSE_KEY_COLS
        ),
        &[&brand_id, &customer_email],
    )
}

pub fn insert_license_key(
    conn: &Connection,
    brand_id: &str,
    customer_email: &str,
) -> Result<LicenseKey> {
    let license_key = LicenseKey {
        id: gen_id(),
        brand_id: brand_id.to_string(),
        customer_email: customer_email.to_string(),
        key: generate_license_key(),
        created_at: now(),
    };
    conn.execute(
        "INSERT INTO license_keys (id, brand_id, customer_email, key, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &license_key.id,
            &license_key.brand_id,
            &license_key.customer_email,
            &license_key.key,
            license_key.created_at
        ],
    )?;
    Ok(license_key)
}

/// The (brand, email) key, minted on first use.
pub fn find_or_create_license_key(
    conn: &Connection,
    brand_id: &str,
    customer_email: &str,
) -> Result<(LicenseKey, bool)> {
    find_or_create(
        conn,
        "license key",
        |c| get_license_key_by_brand_email(c, brand_id, customer_email),
        |c| insert_license_key(c, brand_id, customer_email),
    )
}

/// Every brand's keys for this email, ordered by brand name then age.
pub fn list_license_keys_by_email(
    conn: &Connection,
    customer_email: &str,
) -> Result<Vec<LicenseKeyWithBrand>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM license_keys k JOIN brands b ON b.id = k.brand_id
             WHERE k.customer_email = ?1
             ORDER BY b.name, k.created_at",
            LICENSE_KEY_WITH_BRAND_COLS
        ),
        &[&customer_email],
    )
}

// ============ Licenses ============

pub fn get_license_for_product(
    conn: &Connection,
    license_key_id: &str,
    product_id: &str,
) -> Result<Option<License>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE license_key_id = ?1 AND product_id = ?2",
            LICENSE_COLS
        ),
        &[&license_key_id, &product_id],
    )
}

/// New licenses start valid with a one-year term.
pub fn insert_license(conn: &Connection, license_key_id: &str, product_id: &str) -> Result<License> {
    let created_at = now();
    let license = License {
        id: gen_id(),
        license_key_id: license_key_id.to_string(),
        product_id: product_id.to_string(),
        status: LicenseStatus::Valid,
        expires_at: lifecycle::initial_expiry(created_at),
        created_at,
    };
    conn.execute(
        "INSERT INTO licenses (id, license_key_id, product_id, status, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &license.id,
            &license.license_key_id,
            &license.product_id,
            license.status.as_ref(),
            license.expires_at,
            license.created_at
        ],
    )?;
    Ok(license)
}

/// An existing license is returned as stored, never re-initialized.
pub fn find_or_create_license(
    conn: &Connection,
    license_key_id: &str,
    product_id: &str,
) -> Result<(License, bool)> {
    find_or_create(
        conn,
        "license",
        |c| get_license_for_product(c, license_key_id, product_id),
        |c| insert_license(c, license_key_id, product_id),
    )
}

pub fn get_license_by_product_code(
    conn: &Connection,
    license_key_id: &str,
    product_code: &str,
) -> Result<Option<LicenseWithProduct>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM licenses l JOIN products p ON p.id = l.product_id
             WHERE l.license_key_id = ?1 AND p.code = ?2",
            LICENSE_WITH_PRODUCT_COLS
        ),
        &[&license_key_id, &product_code],
    )
}

pub fn list_licenses_for_key(
    conn: &Connection,
    license_key_id: &str,
) -> Result<Vec<LicenseWithProduct>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM licenses l JOIN products p ON p.id = l.product_id
             WHERE l.license_key_id = ?1
             ORDER BY p.code",
            LICENSE_WITH_PRODUCT_COLS
        ),
        &[&license_key_id],
    )
}

pub fn update_license_state(
    conn: &Connection,
    id: &str,
    status: LicenseStatus,
    expires_at: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET status = ?1, expires_at = ?2 WHERE id = ?3",
        params![status.as_ref(), expires_at, id],
    )?;
    Ok(affected > 0)
}

// ============ Activations ============

pub fn get_activation(
    conn: &Connection,
    license_id: &str,
    instance_id: &str,
) -> Result<Option<Activation>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM activations WHERE license_id = ?1 AND instance_id = ?2",
            ACTIVATION_COLS
        ),
        &[&license_id, &instance_id],
    )
}

pub fn insert_activation(conn: &Connection, license_id: &str, instance_id: &str) -> Result<Activation> {
    let activation = Activation {
        id: gen_id(),
        license_id: license_id.to_string(),
        instance_id: instance_id.to_string(),
        created_at: now(),
        revoked_at: None,
    };
    conn.execute(
        "INSERT INTO activations (id, license_id, instance_id, created_at, revoked_at)
         VALUES (?1, ?2, ?3, ?4, NULL)",
        params![
            &activation.id,
            &activation.license_id,
            &activation.instance_id,
            activation.created_at
        ],
    )?;
    Ok(activation)
}

pub fn find_or_create_activation(
    conn: &Connection,
    license_id: &str,
    instance_id: &str,
) -> Result<(Activation, bool)> {
    find_or_create(
        conn,
        "activation",
        |c| get_activation(c, license_id, instance_id),
        |c| insert_activation(c, license_id, instance_id),
    )
}

/// Clear a revocation. Returns false if the activation was already live.
pub fn clear_activation_revocation(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE activations SET revoked_at = NULL WHERE id = ?1 AND revoked_at IS NOT NULL",
        params![id],
    )?;
    Ok(affected > 0)
}

/// Revoke the live activation for (license, instance), if any.
/// Returns false when there was nothing live to revoke.
pub fn revoke_live_activation(
    conn: &Connection,
    license_id: &str,
    instance_id: &str,
    revoked_at: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE activations SET revoked_at = ?1
         WHERE license_id = ?2 AND instance_id = ?3 AND revoked_at IS NULL",
        params![revoked_at, license_id, instance_id],
    )?;
    Ok(affected > 0)
}

/// Instance ids holding a live activation on the license, oldest first.
pub fn list_live_instance_ids(conn: &Connection, license_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT instance_id FROM activations
         WHERE license_id = ?1 AND revoked_at IS NULL
         ORDER BY created_at, instance_id",
    )?;
    let ids = stmt
        .query_map(params![license_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub fn count_activations(conn: &Connection, license_id: &str, instance_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM activations WHERE license_id = ?1 AND instance_id = ?2",
        params![license_id, instance_id],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

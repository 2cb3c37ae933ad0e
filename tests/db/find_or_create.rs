//! The find-or-create primitive: re-read on a lost uniqueness race, give up
//! with `StoreConflict` after a bounded number of attempts.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use std::cell::Cell;

#[test]
fn test_returns_existing_row_without_inserting() {
    let conn = setup_test_db();
    let (brand, _) = create_test_brand(&conn, "Acme");
    let existing = queries::insert_license_key(&conn, &brand.id, "a@x.com").unwrap();

    let (found, created) = queries::find_or_create_license_key(&conn, &brand.id, "a@x.com").unwrap();
    assert!(!created, "existing key should be returned, not created");
    assert_eq!(found.id, existing.id);
    assert_eq!(found.key, existing.key);
    assert_eq!(count_rows(&conn, "license_keys"), 1);
}

#[test]
fn test_creates_when_missing() {
    let conn = setup_test_db();
    let (brand, _) = create_test_brand(&conn, "Acme");

    let (key, created) = queries::find_or_create_license_key(&conn, &brand.id, "a@x.com").unwrap();
    assert!(created);
    assert!(key.key.starts_with("lk_"));
    assert_eq!(key.customer_email, "a@x.com");
}

#[test]
fn test_lost_race_rereads_winner() {
    let conn = setup_test_db();
    let (brand, _) = create_test_brand(&conn, "Acme");
    // Another writer inserted the row after our first read
    let winner = queries::insert_license_key(&conn, &brand.id, "a@x.com").unwrap();

    let reads = Cell::new(0);
    let creates = Cell::new(0);
    let (found, created) = queries::find_or_create(
        &conn,
        "license key",
        |c| {
            reads.set(reads.get() + 1);
            if reads.get() == 1 {
                // Stale first read
                return Ok(None);
            }
            queries::get_license_key_by_brand_email(c, &brand.id, "a@x.com")
        },
        |c| {
            creates.set(creates.get() + 1);
            queries::insert_license_key(c, &brand.id, "a@x.com")
        },
    )
    .unwrap();

    assert!(!created, "losing creator should report the row as found");
    assert_eq!(found.id, winner.id, "losing creator should observe the winner's row");
    assert_eq!(creates.get(), 1);
    assert_eq!(reads.get(), 2);
    assert_eq!(count_rows(&conn, "license_keys"), 1);
}

#[test]
fn test_gives_up_after_attempt_limit() {
    let conn = setup_test_db();
    let (brand, _) = create_test_brand(&conn, "Acme");
    queries::insert_license_key(&conn, &brand.id, "a@x.com").unwrap();

    let creates = Cell::new(0);
    let result = queries::find_or_create(
        &conn,
        "license key",
        |_| Ok(None::<LicenseKey>),
        |c| {
            creates.set(creates.get() + 1);
            queries::insert_license_key(c, &brand.id, "a@x.com")
        },
    );

    assert!(
        matches!(result, Err(AppError::StoreConflict(_))),
        "exhausted retries should surface as a store conflict"
    );
    assert_eq!(creates.get(), queries::FIND_OR_CREATE_ATTEMPTS);
}

#[test]
fn test_other_errors_are_not_retried() {
    let conn = setup_test_db();
    let creates = Cell::new(0);
    let result = queries::find_or_create(
        &conn,
        "license key",
        |_| Ok(None::<LicenseKey>),
        |c| {
            creates.set(creates.get() + 1);
            // Unknown brand: foreign key failure, not a uniqueness race
            queries::insert_license_key(c, "no-such-brand", "a@x.com")
        },
    );

    assert!(matches!(result, Err(AppError::Database(_))));
    assert_eq!(creates.get(), 1);
}

#[test]
fn test_existing_license_is_not_reinitialized() {
    let conn = setup_test_db();
    let (brand, _) = create_test_brand(&conn, "Acme");
    let product = create_test_product(&conn, &brand.id, "pro");
    let key = queries::insert_license_key(&conn, &brand.id, "a@x.com").unwrap();
    let license = queries::insert_license(&conn, &key.id, &product.id).unwrap();
    let expiry = past_timestamp(3);
    queries::update_license_state(&conn, &license.id, LicenseStatus::Suspended, expiry).unwrap();

    let (found, created) = queries::find_or_create_license(&conn, &key.id, &product.id).unwrap();
    assert!(!created);
    assert_eq!(found.status, LicenseStatus::Suspended);
    assert_eq!(found.expires_at, expiry);
}

#[test]
fn test_new_license_is_valid_for_a_year() {
    let conn = setup_test_db();
    let (brand, _) = create_test_brand(&conn, "Acme");
    let product = create_test_product(&conn, &brand.id, "pro");
    let key = queries::insert_license_key(&conn, &brand.id, "a@x.com").unwrap();

    let (license, created) = queries::find_or_create_license(&conn, &key.id, &product.id).unwrap();
    assert!(created);
    assert_eq!(license.status, LicenseStatus::Valid);
    assert_eq!(license.expires_at, license.created_at + 365 * ONE_DAY);
}

//! Provision: find-or-create the (brand, email) key and one license per product.

#[path = "../common/mod.rs"]
mod common;

use common::*;

fn setup() -> (rusqlite::Connection, Brand) {
    let conn = setup_test_db();
    let (brand, _) = create_test_brand(&conn, "Acme");
    create_test_product(&conn, &brand.id, "pro");
    create_test_product(&conn, &brand.id, "addon");
    (conn, brand)
}

#[test]
fn test_provision_creates_key_and_licenses() {
    let (mut conn, brand) = setup();

    let response = service::provision(
        &mut conn,
        &caller(&brand),
        &provision_request("a@x.com", &["pro", "addon"]),
    )
    .expect("provision should succeed");

    assert!(response.license_key.starts_with("lk_"));
    assert_eq!(response.brand, "Acme");
    assert_eq!(response.customer_email, "a@x.com");
    let products: Vec<_> = response.licenses.iter().map(|l| l.product.as_str()).collect();
    assert_eq!(products, vec!["pro", "addon"], "licenses should follow request order");
    for license in &response.licenses {
        assert_eq!(license.status, LicenseStatus::Valid);
        let days_left = (license.expires_at.timestamp() - now()) / ONE_DAY;
        assert!((364..=365).contains(&days_left), "new licenses should last a year");
    }
    assert_eq!(count_rows(&conn, "license_keys"), 1);
    assert_eq!(count_rows(&conn, "licenses"), 2);
}

#[test]
fn test_provision_is_idempotent() {
    let (mut conn, brand) = setup();
    let request = provision_request("a@x.com", &["pro"]);

    let first = service::provision(&mut conn, &caller(&brand), &request).unwrap();
    let license_before = get_license(&conn, &first.license_key, "pro");
    let second = service::provision(&mut conn, &caller(&brand), &request).unwrap();
    let license_after = get_license(&conn, &second.license_key, "pro");

    assert_eq!(first.license_key, second.license_key, "same brand and email should reuse the key");
    assert_eq!(license_before.id, license_after.id, "same product should reuse the license");
    assert_eq!(license_before.expires_at, license_after.expires_at);
    assert_eq!(count_rows(&conn, "license_keys"), 1);
    assert_eq!(count_rows(&conn, "licenses"), 1);
}

#[test]
fn test_provision_adds_new_products_to_existing_key() {
    let (mut conn, brand) = setup();
    let first = provision_key(&mut conn, &brand, "a@x.com", &["pro"]);
    let second = provision_key(&mut conn, &brand, "a@x.com", &["pro", "addon"]);

    assert_eq!(first, second);
    assert_eq!(count_rows(&conn, "licenses"), 2);
}

#[test]
fn test_provision_does_not_reset_existing_license() {
    let (mut conn, brand) = setup();
    let key = provision_key(&mut conn, &brand, "a@x.com", &["pro"]);
    let expiry = past_timestamp(10);
    set_license_state(&conn, &key, "pro", LicenseStatus::Suspended, expiry);

    let response = service::provision(
        &mut conn,
        &caller(&brand),
        &provision_request("a@x.com", &["pro"]),
    )
    .unwrap();

    assert_eq!(response.licenses[0].status, LicenseStatus::Suspended);
    assert_eq!(response.licenses[0].expires_at.timestamp(), expiry);
}

#[test]
fn test_provision_with_unknown_product_writes_nothing() {
    let (mut conn, brand) = setup();

    let result = service::provision(
        &mut conn,
        &caller(&brand),
        &provision_request("a@x.com", &["pro", "missing"]),
    );

    match result {
        Err(AppError::BadRequest(message)) => {
            assert!(message.contains(msg::UNKNOWN_PRODUCTS));
            assert!(message.contains("missing"), "message should name the unknown code");
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
    assert_eq!(count_rows(&conn, "license_keys"), 0, "no key should be created");
    assert_eq!(count_rows(&conn, "licenses"), 0, "no license should be created");
}

#[test]
fn test_provision_rejects_other_brands_products() {
    let (mut conn, brand) = setup();
    let (other, _) = create_test_brand(&conn, "Globex");
    create_test_product(&conn, &other.id, "enterprise");

    let result = service::provision(
        &mut conn,
        &caller(&brand),
        &provision_request("a@x.com", &["enterprise"]),
    );
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(count_rows(&conn, "license_keys"), 0);
}

#[test]
fn test_provision_one_key_per_brand() {
    let (mut conn, acme) = setup();
    let (globex, _) = create_test_brand(&conn, "Globex");
    create_test_product(&conn, &globex.id, "pro");

    let acme_key = provision_key(&mut conn, &acme, "a@x.com", &["pro"]);
    let globex_key = provision_key(&mut conn, &globex, "a@x.com", &["pro"]);

    assert_ne!(acme_key, globex_key, "each brand should issue its own key");
    assert_eq!(count_rows(&conn, "license_keys"), 2);
}

#[test]
fn test_provision_requires_brand() {
    let (mut conn, _) = setup();
    let result = service::provision(
        &mut conn,
        &Caller::Anonymous,
        &provision_request("a@x.com", &["pro"]),
    );
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

#[test]
fn test_provision_validates_input() {
    let (mut conn, brand) = setup();

    for (email, codes) in [
        ("", vec!["pro"]),
        ("not-an-email", vec!["pro"]),
        ("a@x.com", vec![]),
        ("a@x.com", vec![" "]),
        ("a@x.com", vec!["pro", "pro"]),
    ] {
        let result = service::provision(&mut conn, &caller(&brand), &provision_request(email, &codes));
        assert!(
            matches!(result, Err(AppError::BadRequest(_))),
            "email {:?} with codes {:?} should be rejected",
            email,
            codes
        );
    }
    assert_eq!(count_rows(&conn, "license_keys"), 0);
}

#[test]
fn test_provision_trims_email() {
    let (mut conn, brand) = setup();
    let first = provision_key(&mut conn, &brand, "  a@x.com ", &["pro"]);
    let second = provision_key(&mut conn, &brand, "a@x.com", &["pro"]);
    assert_eq!(first, second);
}

//! Lifecycle actions: suspend, resume, cancel, renew; brand scoping.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use rusqlite::Connection;
use serde_json::json;

fn setup() -> (Connection, Brand, String) {
    let mut conn = setup_test_db();
    let (brand, _) = create_test_brand(&conn, "Acme");
    create_test_product(&conn, &brand.id, "pro");
    let key = provision_key(&mut conn, &brand, "a@x.com", &["pro"]);
    (conn, brand, key)
}

fn apply(
    conn: &mut Connection,
    brand: &Brand,
    key: &str,
    action: &str,
    extend_days: Option<serde_json::Value>,
) -> Result<LifecycleResponse, AppError> {
    service::apply_lifecycle(conn, &caller(brand), &lifecycle_request(key, "pro", action, extend_days))
}

#[test]
fn test_suspend_and_resume() {
    let (mut conn, brand, key) = setup();

    let suspended = apply(&mut conn, &brand, &key, "suspend", None).unwrap();
    assert_eq!(suspended.status, LicenseStatus::Suspended);
    assert_eq!(get_license(&conn, &key, "pro").status, LicenseStatus::Suspended);

    let resumed = apply(&mut conn, &brand, &key, "resume", None).unwrap();
    assert_eq!(resumed.status, LicenseStatus::Valid);
    assert_eq!(get_license(&conn, &key, "pro").status, LicenseStatus::Valid);
}

#[test]
fn test_resume_cancelled_stays_cancelled() {
    let (mut conn, brand, key) = setup();
    apply(&mut conn, &brand, &key, "cancel", None).unwrap();

    let response = apply(&mut conn, &brand, &key, "resume", None)
        .expect("resuming a cancelled license should not be an error");
    assert_eq!(response.status, LicenseStatus::Cancelled);
    assert_eq!(get_license(&conn, &key, "pro").status, LicenseStatus::Cancelled);
}

#[test]
fn test_cancel_keeps_expiry() {
    let (mut conn, brand, key) = setup();
    let before = get_license(&conn, &key, "pro");

    let response = apply(&mut conn, &brand, &key, "cancel", None).unwrap();
    assert_eq!(response.status, LicenseStatus::Cancelled);
    assert_eq!(response.expires_at.timestamp(), before.expires_at);
}

#[test]
fn test_renew_unexpired_stacks_on_expiry() {
    let (mut conn, brand, key) = setup();
    let expiry = future_timestamp(10);
    set_license_state(&conn, &key, "pro", LicenseStatus::Valid, expiry);

    let response = apply(&mut conn, &brand, &key, "renew", Some(json!(30))).unwrap();

    assert_eq!(response.expires_at.timestamp(), expiry + 30 * ONE_DAY);
    assert_eq!(get_license(&conn, &key, "pro").expires_at, expiry + 30 * ONE_DAY);
}

#[test]
fn test_renew_expired_starts_from_now() {
    let (mut conn, brand, key) = setup();
    set_license_state(&conn, &key, "pro", LicenseStatus::Valid, past_timestamp(100));

    let before = now();
    let response = apply(&mut conn, &brand, &key, "renew", Some(json!(30))).unwrap();
    let after = now();

    let expiry = response.expires_at.timestamp();
    assert!(
        expiry >= before + 30 * ONE_DAY && expiry <= after + 30 * ONE_DAY,
        "expired license should renew from now, not from the past expiry"
    );
}

#[test]
fn test_renew_defaults_to_one_year_and_revalidates() {
    let (mut conn, brand, key) = setup();
    let expiry = future_timestamp(5);
    set_license_state(&conn, &key, "pro", LicenseStatus::Cancelled, expiry);

    let response = apply(&mut conn, &brand, &key, "renew", None).unwrap();
    assert_eq!(response.status, LicenseStatus::Valid);
    assert_eq!(response.expires_at.timestamp(), expiry + 365 * ONE_DAY);
}

#[test]
fn test_renew_accepts_integer_string() {
    let (mut conn, brand, key) = setup();
    let expiry = future_timestamp(5);
    set_license_state(&conn, &key, "pro", LicenseStatus::Valid, expiry);

    let response = apply(&mut conn, &brand, &key, "renew", Some(json!("7"))).unwrap();
    assert_eq!(response.expires_at.timestamp(), expiry + 7 * ONE_DAY);
}

#[test]
fn test_renew_rejects_non_integer_days() {
    let (mut conn, brand, key) = setup();
    let before = get_license(&conn, &key, "pro");

    for bad in [json!("abc"), json!(1.5), json!(0), json!(true)] {
        let result = apply(&mut conn, &brand, &key, "renew", Some(bad.clone()));
        assert!(
            matches!(result, Err(AppError::BadRequest(_))),
            "extend_days {} should be rejected",
            bad
        );
    }
    assert_eq!(get_license(&conn, &key, "pro").expires_at, before.expires_at);
}

#[test]
fn test_successive_renewals_accumulate() {
    let (mut conn, brand, key) = setup();
    let expiry = future_timestamp(1);
    set_license_state(&conn, &key, "pro", LicenseStatus::Valid, expiry);

    apply(&mut conn, &brand, &key, "renew", Some(json!(10))).unwrap();
    apply(&mut conn, &brand, &key, "renew", Some(json!(10))).unwrap();

    assert_eq!(get_license(&conn, &key, "pro").expires_at, expiry + 20 * ONE_DAY);
}

#[test]
fn test_action_is_case_insensitive() {
    let (mut conn, brand, key) = setup();
    let response = apply(&mut conn, &brand, &key, "  SUSPEND ", None).unwrap();
    assert_eq!(response.status, LicenseStatus::Suspended);
}

#[test]
fn test_unknown_action_is_rejected() {
    let (mut conn, brand, key) = setup();
    let result = apply(&mut conn, &brand, &key, "delete", None);
    assert!(matches!(result, Err(AppError::BadRequest(ref m)) if m == msg::UNKNOWN_ACTION));
    assert_eq!(get_license(&conn, &key, "pro").status, LicenseStatus::Valid);
}

#[test]
fn test_other_brand_key_is_not_found() {
    let (mut conn, owner, key) = setup();
    let (intruder, _) = create_test_brand(&conn, "Globex");
    create_test_product(&conn, &intruder.id, "pro");
    let before = get_license(&conn, &key, "pro");

    for action in ["suspend", "resume", "cancel", "renew"] {
        let result = apply(&mut conn, &intruder, &key, action, None);
        assert!(
            matches!(result, Err(AppError::NotFound(ref m)) if m == msg::LICENSE_KEY_NOT_FOUND),
            "{} on another brand's key should look like a missing key",
            action
        );
    }

    let after = get_license(&conn, &key, "pro");
    assert_eq!(after.status, before.status, "owner's license should be untouched");
    assert_eq!(after.expires_at, before.expires_at);

    // The owner can still manage it
    assert!(apply(&mut conn, &owner, &key, "suspend", None).is_ok());
}

#[test]
fn test_unlicensed_product_is_not_found() {
    let (mut conn, brand, key) = setup();
    create_test_product(&conn, &brand.id, "addon");

    let result = service::apply_lifecycle(
        &mut conn,
        &caller(&brand),
        &lifecycle_request(&key, "addon", "suspend", None),
    );
    assert!(
        matches!(result, Err(AppError::NotFound(ref m)) if m == msg::LICENSE_NOT_FOUND_FOR_PRODUCT)
    );
}

#[test]
fn test_lookups_run_before_action_parsing() {
    let (mut conn, brand, key) = setup();
    create_test_product(&conn, &brand.id, "addon");

    let unknown = license_hub::keys::generate_license_key();
    let no_key = service::apply_lifecycle(
        &mut conn,
        &caller(&brand),
        &lifecycle_request(&unknown, "pro", "explode", None),
    );
    assert!(
        matches!(no_key, Err(AppError::NotFound(ref m)) if m == msg::LICENSE_KEY_NOT_FOUND),
        "a missing key should win over an unknown action"
    );

    let no_license = service::apply_lifecycle(
        &mut conn,
        &caller(&brand),
        &lifecycle_request(&key, "addon", "renew", Some(json!("soon"))),
    );
    assert!(
        matches!(no_license, Err(AppError::NotFound(ref m)) if m == msg::LICENSE_NOT_FOUND_FOR_PRODUCT),
        "a missing license should win over a bad extend_days"
    );
}

#[test]
fn test_required_fields_checked_before_key_shape() {
    let (mut conn, brand, _) = setup();
    let result = service::apply_lifecycle(
        &mut conn,
        &caller(&brand),
        &lifecycle_request("lk_x", "pro", "  ", None),
    );
    assert!(matches!(result, Err(AppError::BadRequest(ref m)) if m == "action is required"));
}

#[test]
fn test_lifecycle_requires_brand() {
    let (mut conn, _, key) = setup();
    let result = service::apply_lifecycle(
        &mut conn,
        &Caller::Anonymous,
        &lifecycle_request(&key, "pro", "suspend", None),
    );
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

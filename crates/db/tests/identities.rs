//! Integration tests for application credentials and instance registration.

use sqlx::PgPool;

use conductor_db::repositories::ApplicationRepo;

#[sqlx::test]
async fn login_verifies_only_the_matching_hash(pool: PgPool) {
    let app = ApplicationRepo::create(&pool, "acme", "aa11").await.unwrap();

    let found = ApplicationRepo::verify_login(&pool, "acme", "aa11").await.unwrap();
    assert_eq!(found, Some(app.id));

    assert!(ApplicationRepo::verify_login(&pool, "acme", "bb22")
        .await
        .unwrap()
        .is_none());
    assert!(ApplicationRepo::verify_login(&pool, "ghost", "aa11")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test]
async fn disabled_applications_cannot_log_in(pool: PgPool) {
    let app = ApplicationRepo::create(&pool, "acme", "aa11").await.unwrap();
    sqlx::query("UPDATE applications SET disabled = TRUE WHERE id = $1")
        .bind(app.id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(ApplicationRepo::verify_login(&pool, "acme", "aa11")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test]
async fn duplicate_logins_are_rejected(pool: PgPool) {
    ApplicationRepo::create(&pool, "acme", "aa11").await.unwrap();
    let err = ApplicationRepo::create(&pool, "acme", "cc33").await;
    assert!(err.is_err(), "logins are unique");
}

#[sqlx::test]
async fn instance_registration_is_idempotent(pool: PgPool) {
    let app = ApplicationRepo::create(&pool, "acme", "aa11").await.unwrap();

    let first = ApplicationRepo::register_instance_if_needed(&pool, app.id, "device-1")
        .await
        .unwrap();
    let second = ApplicationRepo::register_instance_if_needed(&pool, app.id, "device-1")
        .await
        .unwrap();
    assert_eq!(first, second);

    let other = ApplicationRepo::register_instance_if_needed(&pool, app.id, "device-2")
        .await
        .unwrap();
    assert_ne!(first, other);
}

#[sqlx::test]
async fn instances_are_scoped_to_their_application(pool: PgPool) {
    let alpha = ApplicationRepo::create(&pool, "alpha", "aa11").await.unwrap();
    let bravo = ApplicationRepo::create(&pool, "bravo", "bb22").await.unwrap();

    // The same UID under two applications is two distinct instances.
    let a = ApplicationRepo::register_instance_if_needed(&pool, alpha.id, "device-1")
        .await
        .unwrap();
    let b = ApplicationRepo::register_instance_if_needed(&pool, bravo.id, "device-1")
        .await
        .unwrap();
    assert_ne!(a, b);

    let instance = ApplicationRepo::find_instance(&pool, alpha.id, "device-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(instance.id, a);
    assert_eq!(instance.application_id, alpha.id);
}

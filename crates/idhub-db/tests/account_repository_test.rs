//! Integration tests for the account repository using in-memory SurrealDB.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use idhub_core::models::account::{AccountStatus, CreateAccount, UpdateAccount};
use idhub_core::models::person::{CreatePerson, Gender};
use idhub_core::repository::{AccountRepository, PersonRepository};
use idhub_db::repository::{SurrealAccountRepository, SurrealPersonRepository};
use idhub_db::verify_password;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create an owner person.
async fn setup() -> (Surreal<surrealdb::engine::local::Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    idhub_db::run_migrations(&db).await.unwrap();

    let person_repo = SurrealPersonRepository::new(db.clone());
    let person = person_repo
        .create(CreatePerson {
            first_name: "Kari".into(),
            last_name: "Nordmann".into(),
            birth_date: None,
            gender: Gender::Female,
        })
        .await
        .unwrap();

    (db, person.id)
}

#[tokio::test]
async fn create_and_get_account() {
    let (db, owner_id) = setup().await;
    let repo = SurrealAccountRepository::new(db);

    let account = repo
        .create(CreateAccount {
            owner_id,
            name: "karin".into(),
            password: "SuperSecret123!".into(),
            expire_date: None,
        })
        .await
        .unwrap();

    assert_eq!(account.owner_id, owner_id);
    assert_eq!(account.name, "karin");
    assert_eq!(account.status, AccountStatus::Active);

    // Password should be hashed, not stored in plaintext.
    assert_ne!(account.password_hash, "SuperSecret123!");
    assert!(account.password_hash.starts_with("$argon2id$"));

    let fetched = repo.get_by_id(account.id).await.unwrap();
    assert_eq!(fetched.id, account.id);

    let by_name = repo.get_by_name("karin").await.unwrap();
    assert_eq!(by_name.id, account.id);
}

#[tokio::test]
async fn password_verification() {
    let (db, owner_id) = setup().await;
    let repo = SurrealAccountRepository::new(db);

    let account = repo
        .create(CreateAccount {
            owner_id,
            name: "bob".into(),
            password: "MyPassword42!".into(),
            expire_date: None,
        })
        .await
        .unwrap();

    assert!(verify_password("MyPassword42!", &account.password_hash, None).unwrap());
    assert!(!verify_password("WrongPassword", &account.password_hash, None).unwrap());
}

#[tokio::test]
async fn password_with_pepper() {
    let (db, owner_id) = setup().await;
    let pepper = "server-secret-pepper".to_string();
    let repo = SurrealAccountRepository::with_pepper(db, pepper.clone());

    let account = repo
        .create(CreateAccount {
            owner_id,
            name: "carol".into(),
            password: "PepperedPass!".into(),
            expire_date: None,
        })
        .await
        .unwrap();

    assert!(verify_password("PepperedPass!", &account.password_hash, Some(&pepper)).unwrap());
    // Without the pepper the hash must not verify.
    assert!(!verify_password("PepperedPass!", &account.password_hash, None).unwrap());
}

#[tokio::test]
async fn set_password_rotates_hash() {
    let (db, owner_id) = setup().await;
    let repo = SurrealAccountRepository::new(db);

    let account = repo
        .create(CreateAccount {
            owner_id,
            name: "dave".into(),
            password: "OldPassword1!".into(),
            expire_date: None,
        })
        .await
        .unwrap();

    repo.set_password(account.id, "NewPassword2!").await.unwrap();

    let updated = repo.get_by_id(account.id).await.unwrap();
    assert_ne!(updated.password_hash, account.password_hash);
    assert!(verify_password("NewPassword2!", &updated.password_hash, None).unwrap());
    assert!(!verify_password("OldPassword1!", &updated.password_hash, None).unwrap());
}

#[tokio::test]
async fn update_status_and_expire_date() {
    let (db, owner_id) = setup().await;
    let repo = SurrealAccountRepository::new(db);

    let account = repo
        .create(CreateAccount {
            owner_id,
            name: "erin".into(),
            password: "Password3!".into(),
            expire_date: NaiveDate::from_ymd_opt(2026, 12, 31),
        })
        .await
        .unwrap();
    assert_eq!(account.expire_date, NaiveDate::from_ymd_opt(2026, 12, 31));

    let updated = repo
        .update(
            account.id,
            UpdateAccount {
                status: Some(AccountStatus::Quarantined),
                expire_date: Some(None),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, AccountStatus::Quarantined);
    assert!(updated.expire_date.is_none());
}

#[tokio::test]
async fn list_by_owner() {
    let (db, owner_id) = setup().await;
    let repo = SurrealAccountRepository::new(db);

    for name in ["primary", "secondary"] {
        repo.create(CreateAccount {
            owner_id,
            name: name.into(),
            password: "Password4!".into(),
            expire_date: None,
        })
        .await
        .unwrap();
    }

    let accounts = repo.list_by_owner(owner_id).await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].name, "primary");
    assert_eq!(accounts[1].name, "secondary");

    let none = repo.list_by_owner(Uuid::new_v4()).await.unwrap();
    assert!(none.is_empty());
}

//! Integration tests for the person repository using in-memory SurrealDB.

#![allow(clippy::unwrap_used)]

use chrono::{NaiveDate, Utc};
use idhub_core::HubError;
use idhub_core::models::affiliation::{Affiliation, AffiliationKind, AffiliationStatus};
use idhub_core::models::contact::{ContactInfo, ContactType};
use idhub_core::models::external_id::{ExternalId, ExternalIdType};
use idhub_core::models::person::{CreatePerson, Gender, UpdatePerson};
use idhub_core::models::quarantine::{Quarantine, QuarantineType};
use idhub_core::models::source::SourceSystem;
use idhub_core::repository::PersonRepository;
use idhub_db::repository::SurrealPersonRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    idhub_db::run_migrations(&db).await.unwrap();
    db
}

fn sample_person() -> CreatePerson {
    CreatePerson {
        first_name: "Kari".into(),
        last_name: "Nordmann".into(),
        birth_date: NaiveDate::from_ymd_opt(1985, 6, 15),
        gender: Gender::Female,
    }
}

#[tokio::test]
async fn create_and_get_person() {
    let db = setup().await;
    let repo = SurrealPersonRepository::new(db);

    let person = repo.create(sample_person()).await.unwrap();
    assert_eq!(person.first_name, "Kari");
    assert_eq!(person.gender, Gender::Female);
    assert_eq!(person.birth_date, NaiveDate::from_ymd_opt(1985, 6, 15));

    let fetched = repo.get_by_id(person.id).await.unwrap();
    assert_eq!(fetched.id, person.id);
    assert_eq!(fetched.last_name, "Nordmann");
}

#[tokio::test]
async fn update_person_clears_birth_date() {
    let db = setup().await;
    let repo = SurrealPersonRepository::new(db);

    let person = repo.create(sample_person()).await.unwrap();

    let updated = repo
        .update(
            person.id,
            UpdatePerson {
                last_name: Some("Hansen".into()),
                birth_date: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.last_name, "Hansen");
    assert!(updated.birth_date.is_none());
    // Untouched fields survive.
    assert_eq!(updated.first_name, "Kari");
}

#[tokio::test]
async fn get_missing_person_fails() {
    let db = setup().await;
    let repo = SurrealPersonRepository::new(db);

    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, HubError::NotFound { .. }));
}

#[tokio::test]
async fn external_ids_are_source_scoped() {
    let db = setup().await;
    let repo = SurrealPersonRepository::new(db);
    let person = repo.create(sample_person()).await.unwrap();

    let emp_no = ExternalId::new(ExternalIdType::EmployeeNumber, "123456");
    repo.set_external_id(person.id, SourceSystem::Hr, &emp_no)
        .await
        .unwrap();
    repo.set_external_id(
        person.id,
        SourceSystem::Manual,
        &ExternalId::new(ExternalIdType::PassportNumber, "NO-X1234567"),
    )
    .await
    .unwrap();

    let hr_ids = repo
        .list_external_ids(person.id, SourceSystem::Hr)
        .await
        .unwrap();
    assert_eq!(hr_ids, vec![emp_no.clone()]);

    // Setting the same type again replaces the value.
    let new_emp_no = ExternalId::new(ExternalIdType::EmployeeNumber, "654321");
    repo.set_external_id(person.id, SourceSystem::Hr, &new_emp_no)
        .await
        .unwrap();
    let hr_ids = repo
        .list_external_ids(person.id, SourceSystem::Hr)
        .await
        .unwrap();
    assert_eq!(hr_ids, vec![new_emp_no]);

    repo.remove_external_id(person.id, SourceSystem::Hr, ExternalIdType::EmployeeNumber)
        .await
        .unwrap();
    assert!(
        repo.list_external_ids(person.id, SourceSystem::Hr)
            .await
            .unwrap()
            .is_empty()
    );

    // The manual passport survived the HR removals.
    let manual_ids = repo
        .list_external_ids(person.id, SourceSystem::Manual)
        .await
        .unwrap();
    assert_eq!(manual_ids.len(), 1);
}

#[tokio::test]
async fn find_by_external_id() {
    let db = setup().await;
    let repo = SurrealPersonRepository::new(db);
    let person = repo.create(sample_person()).await.unwrap();

    repo.set_external_id(
        person.id,
        SourceSystem::Hr,
        &ExternalId::new(ExternalIdType::NationalIdNumber, "15068512345"),
    )
    .await
    .unwrap();

    let found = repo
        .find_by_external_id(ExternalIdType::NationalIdNumber, "15068512345")
        .await
        .unwrap();
    assert_eq!(found.unwrap().id, person.id);

    let missing = repo
        .find_by_external_id(ExternalIdType::NationalIdNumber, "01010112345")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn find_by_external_id_ambiguous_across_sources() {
    let db = setup().await;
    let repo = SurrealPersonRepository::new(db);
    let a = repo.create(sample_person()).await.unwrap();
    let b = repo
        .create(CreatePerson {
            first_name: "Ola".into(),
            last_name: "Nordmann".into(),
            birth_date: None,
            gender: Gender::Male,
        })
        .await
        .unwrap();

    // Two sources claim the same employee number for different persons.
    repo.set_external_id(
        a.id,
        SourceSystem::Hr,
        &ExternalId::new(ExternalIdType::EmployeeNumber, "777"),
    )
    .await
    .unwrap();
    repo.set_external_id(
        b.id,
        SourceSystem::Manual,
        &ExternalId::new(ExternalIdType::EmployeeNumber, "777"),
    )
    .await
    .unwrap();

    let err = repo
        .find_by_external_id(ExternalIdType::EmployeeNumber, "777")
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::AmbiguousMatch { .. }));
}

#[tokio::test]
async fn affiliations_add_list_remove() {
    let db = setup().await;
    let repo = SurrealPersonRepository::new(db);
    let person = repo.create(sample_person()).await.unwrap();
    let ou_id = Uuid::new_v4();

    let aff = Affiliation {
        ou_id,
        kind: AffiliationKind::Employee,
        status: AffiliationStatus::Academic,
        precedence: Some(50),
    };
    repo.add_affiliation(person.id, SourceSystem::Hr, &aff)
        .await
        .unwrap();

    let listed = repo
        .list_affiliations(person.id, SourceSystem::Hr)
        .await
        .unwrap();
    assert_eq!(listed, vec![aff.clone()]);

    // Other sources see nothing.
    assert!(
        repo.list_affiliations(person.id, SourceSystem::StudentRegistry)
            .await
            .unwrap()
            .is_empty()
    );

    repo.remove_affiliation(person.id, SourceSystem::Hr, &aff)
        .await
        .unwrap();
    assert!(
        repo.list_affiliations(person.id, SourceSystem::Hr)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn contact_info_add_list_remove() {
    let db = setup().await;
    let repo = SurrealPersonRepository::new(db);
    let person = repo.create(sample_person()).await.unwrap();

    let phone = ContactInfo {
        contact_type: ContactType::WorkPhone,
        preference: 0,
        value: "+4722855050".into(),
    };
    let email = ContactInfo {
        contact_type: ContactType::WorkEmail,
        preference: 0,
        value: "kari@example.org".into(),
    };
    repo.add_contact_info(person.id, SourceSystem::Hr, &phone)
        .await
        .unwrap();
    repo.add_contact_info(person.id, SourceSystem::Hr, &email)
        .await
        .unwrap();

    let listed = repo
        .list_contact_info(person.id, SourceSystem::Hr)
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);

    repo.remove_contact_info(person.id, SourceSystem::Hr, &phone)
        .await
        .unwrap();
    let listed = repo
        .list_contact_info(person.id, SourceSystem::Hr)
        .await
        .unwrap();
    assert_eq!(listed, vec![email]);
}

#[tokio::test]
async fn quarantine_lifecycle() {
    let db = setup().await;
    let repo = SurrealPersonRepository::new(db);
    let person = repo.create(sample_person()).await.unwrap();

    let q = Quarantine {
        quarantine_type: QuarantineType::AutoInactive,
        reason: "no active affiliations".into(),
        start_at: Utc::now(),
        end_at: None,
    };
    repo.add_quarantine(person.id, &q).await.unwrap();

    let listed = repo.list_quarantines(person.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].quarantine_type, QuarantineType::AutoInactive);
    assert_eq!(listed[0].reason, "no active affiliations");

    // Adding the same type again replaces the record.
    let q2 = Quarantine {
        reason: "still inactive".into(),
        ..q
    };
    repo.add_quarantine(person.id, &q2).await.unwrap();
    let listed = repo.list_quarantines(person.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].reason, "still inactive");

    repo.clear_quarantine(person.id, QuarantineType::AutoInactive)
        .await
        .unwrap();
    assert!(repo.list_quarantines(person.id).await.unwrap().is_empty());
}

//! Export rendering against a seeded in-memory database.

#![allow(clippy::unwrap_used)]

use idhub_core::models::account::CreateAccount;
use idhub_core::models::affiliation::{Affiliation, AffiliationKind, AffiliationStatus};
use idhub_core::models::external_id::{ExternalId, ExternalIdType};
use idhub_core::models::group::CreateGroup;
use idhub_core::models::org_unit::CreateOrgUnit;
use idhub_core::models::person::{CreatePerson, Gender};
use idhub_core::models::source::SourceSystem;
use idhub_core::repository::{
    AccountRepository, GroupRepository, OrgUnitRepository, PersonRepository,
};
use idhub_db::repository::{
    SurrealAccountRepository, SurrealGroupRepository, SurrealOrgUnitRepository,
    SurrealPersonRepository,
};
use idhub_export::{build_group_map, build_person_feed, group_map, person_feed};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    idhub_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn person_feed_from_seeded_db() {
    let db = setup().await;
    let persons = SurrealPersonRepository::new(db.clone());
    let org_units = SurrealOrgUnitRepository::new(db.clone());

    let ou = org_units
        .create(CreateOrgUnit {
            placecode: "332211".into(),
            name: "Department of Informatics".into(),
            parent_id: None,
        })
        .await
        .unwrap();

    let kari = persons
        .create(CreatePerson {
            first_name: "Kari".into(),
            last_name: "Nordmann".into(),
            birth_date: None,
            gender: Gender::Female,
        })
        .await
        .unwrap();
    persons
        .set_external_id(
            kari.id,
            SourceSystem::Hr,
            &ExternalId::new(ExternalIdType::EmployeeNumber, "123456"),
        )
        .await
        .unwrap();
    persons
        .add_affiliation(
            kari.id,
            SourceSystem::Hr,
            &Affiliation {
                ou_id: ou.id,
                kind: AffiliationKind::Employee,
                status: AffiliationStatus::Academic,
                precedence: Some(50),
            },
        )
        .await
        .unwrap();

    // A person without HR data still shows up with empty columns.
    persons
        .create(CreatePerson {
            first_name: "Ola".into(),
            last_name: "Hansen".into(),
            birth_date: None,
            gender: Gender::Male,
        })
        .await
        .unwrap();

    let entries = build_person_feed(&persons, &org_units).await.unwrap();
    assert_eq!(entries.len(), 2);

    let feed = person_feed(&entries);
    let kari_line = feed
        .lines()
        .find(|l| l.contains("Kari"))
        .unwrap();
    assert_eq!(
        kari_line,
        format!("{};Kari;Nordmann;123456;EMPLOYEE/academic@332211", kari.id)
    );
    let ola_line = feed.lines().find(|l| l.contains("Ola")).unwrap();
    assert!(ola_line.ends_with(";Ola;Hansen;;"));
}

#[tokio::test]
async fn group_map_from_seeded_db() {
    let db = setup().await;
    let persons = SurrealPersonRepository::new(db.clone());
    let groups = SurrealGroupRepository::new(db.clone());
    let accounts = SurrealAccountRepository::new(db.clone());

    let staff = groups
        .create(CreateGroup {
            name: "staff".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let kari = persons
        .create(CreatePerson {
            first_name: "Kari".into(),
            last_name: "Nordmann".into(),
            birth_date: None,
            gender: Gender::Female,
        })
        .await
        .unwrap();
    accounts
        .create(CreateAccount {
            owner_id: kari.id,
            name: "karin".into(),
            password: "Password1!".into(),
            expire_date: None,
        })
        .await
        .unwrap();
    groups.add_member(staff.id, kari.id).await.unwrap();

    // Member without an account is skipped.
    let ola = persons
        .create(CreatePerson {
            first_name: "Ola".into(),
            last_name: "Hansen".into(),
            birth_date: None,
            gender: Gender::Male,
        })
        .await
        .unwrap();
    groups.add_member(staff.id, ola.id).await.unwrap();

    let entries = build_group_map(&groups, &accounts).await.unwrap();
    let rendered = group_map(&entries);
    assert_eq!(rendered, "staff:karin\n");
}

//! Integration tests for the org unit repository using in-memory SurrealDB.

#![allow(clippy::unwrap_used)]

use idhub_core::models::org_unit::{CreateOrgUnit, UpdateOrgUnit};
use idhub_core::repository::{OrgUnitRepository, Pagination};
use idhub_db::repository::SurrealOrgUnitRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    idhub_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn create_and_get_org_unit() {
    let db = setup().await;
    let repo = SurrealOrgUnitRepository::new(db);

    let ou = repo
        .create(CreateOrgUnit {
            placecode: "332211".into(),
            name: "Department of Informatics".into(),
            parent_id: None,
        })
        .await
        .unwrap();

    assert_eq!(ou.placecode, "332211");
    assert_eq!(ou.name, "Department of Informatics");
    assert!(ou.parent_id.is_none());

    let fetched = repo.get_by_id(ou.id).await.unwrap();
    assert_eq!(fetched.id, ou.id);
    assert_eq!(fetched.placecode, "332211");
}

#[tokio::test]
async fn get_by_placecode() {
    let db = setup().await;
    let repo = SurrealOrgUnitRepository::new(db);

    let ou = repo
        .create(CreateOrgUnit {
            placecode: "112233".into(),
            name: "Faculty of Science".into(),
            parent_id: None,
        })
        .await
        .unwrap();

    let found = repo.get_by_placecode("112233").await.unwrap();
    assert_eq!(found.unwrap().id, ou.id);

    let missing = repo.get_by_placecode("999999").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn update_org_unit_parent() {
    let db = setup().await;
    let repo = SurrealOrgUnitRepository::new(db);

    let faculty = repo
        .create(CreateOrgUnit {
            placecode: "110000".into(),
            name: "Faculty of Science".into(),
            parent_id: None,
        })
        .await
        .unwrap();

    let dept = repo
        .create(CreateOrgUnit {
            placecode: "113100".into(),
            name: "Department of Physics".into(),
            parent_id: None,
        })
        .await
        .unwrap();

    let updated = repo
        .update(
            dept.id,
            UpdateOrgUnit {
                name: None,
                parent_id: Some(Some(faculty.id)),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.parent_id, Some(faculty.id));

    // Some(None) clears the parent again.
    let cleared = repo
        .update(
            dept.id,
            UpdateOrgUnit {
                name: None,
                parent_id: Some(None),
            },
        )
        .await
        .unwrap();
    assert!(cleared.parent_id.is_none());
}

#[tokio::test]
async fn list_org_units_paginated() {
    let db = setup().await;
    let repo = SurrealOrgUnitRepository::new(db);

    for i in 0..5 {
        repo.create(CreateOrgUnit {
            placecode: format!("10000{i}"),
            name: format!("Unit {i}"),
            parent_id: None,
        })
        .await
        .unwrap();
    }

    let page = repo
        .list(Pagination {
            offset: 0,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.items[0].placecode, "100000");

    let rest = repo
        .list(Pagination {
            offset: 3,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 2);
}

//! Person feed and group map rendering.

use std::path::Path;

use idhub_core::error::{HubError, HubResult};
use idhub_core::models::external_id::ExternalIdType;
use idhub_core::models::source::SourceSystem;
use idhub_core::repository::{
    AccountRepository, GroupRepository, OrgUnitRepository, Pagination, PersonRepository,
};
use tracing::warn;
use uuid::Uuid;

const PAGE_SIZE: u64 = 200;

/// One person in the feed, with HR data flattened for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonFeedEntry {
    pub person_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub employee_number: Option<String>,
    /// `KIND/status@placecode` strings.
    pub affiliations: Vec<String>,
}

/// One group in the map with its resolved member names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMapEntry {
    pub name: String,
    pub members: Vec<String>,
}

/// Render the person feed: one semicolon-separated line per person,
/// sorted by person id.
pub fn person_feed(entries: &[PersonFeedEntry]) -> String {
    let mut rows: Vec<&PersonFeedEntry> = entries.iter().collect();
    rows.sort_by_key(|e| e.person_id);

    let mut out = String::new();
    for entry in rows {
        let mut affiliations = entry.affiliations.clone();
        affiliations.sort();
        out.push_str(&format!(
            "{};{};{};{};{}\n",
            entry.person_id,
            entry.first_name,
            entry.last_name,
            entry.employee_number.as_deref().unwrap_or(""),
            affiliations.join(","),
        ));
    }
    out
}

/// Render the group map: `groupname:member,member,…` lines sorted by
/// group name, members sorted within each line.
pub fn group_map(entries: &[GroupMapEntry]) -> String {
    let mut rows: Vec<&GroupMapEntry> = entries.iter().collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = String::new();
    for entry in rows {
        let mut members = entry.members.clone();
        members.sort();
        out.push_str(&format!("{}:{}\n", entry.name, members.join(",")));
    }
    out
}

/// Gather person feed entries from the repositories.
pub async fn build_person_feed<P, O>(
    persons: &P,
    org_units: &O,
) -> HubResult<Vec<PersonFeedEntry>>
where
    P: PersonRepository,
    O: OrgUnitRepository,
{
    let mut entries = Vec::new();
    let mut offset = 0;

    loop {
        let page = persons
            .list(Pagination {
                offset,
                limit: PAGE_SIZE,
            })
            .await?;
        let fetched = page.items.len() as u64;

        for person in page.items {
            let employee_number = persons
                .list_external_ids(person.id, SourceSystem::Hr)
                .await?
                .into_iter()
                .find(|e| e.id_type == ExternalIdType::EmployeeNumber)
                .map(|e| e.value);

            let mut affiliations = Vec::new();
            for aff in persons
                .list_affiliations(person.id, SourceSystem::Hr)
                .await?
            {
                let placecode = match org_units.get_by_id(aff.ou_id).await {
                    Ok(ou) => ou.placecode,
                    Err(HubError::NotFound { .. }) => {
                        warn!(person_id = %person.id, ou_id = %aff.ou_id,
                              "affiliation points at missing org unit");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                affiliations.push(format!(
                    "{}/{}@{}",
                    aff.kind.as_str(),
                    aff.status.as_str(),
                    placecode,
                ));
            }

            entries.push(PersonFeedEntry {
                person_id: person.id,
                first_name: person.first_name,
                last_name: person.last_name,
                employee_number,
                affiliations,
            });
        }

        if fetched < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }

    Ok(entries)
}

/// Gather group map entries from the repositories.
///
/// Members are rendered as account names; persons without an account
/// are skipped.
pub async fn build_group_map<G, A>(groups: &G, accounts: &A) -> HubResult<Vec<GroupMapEntry>>
where
    G: GroupRepository,
    A: AccountRepository,
{
    let mut entries = Vec::new();
    let mut offset = 0;

    loop {
        let page = groups
            .list(Pagination {
                offset,
                limit: PAGE_SIZE,
            })
            .await?;
        let fetched = page.items.len() as u64;

        for group in page.items {
            let mut members = Vec::new();
            for person in groups.get_members(group.id).await? {
                // First account name stands in for the person.
                let Some(account) = accounts.list_by_owner(person.id).await?.into_iter().next()
                else {
                    continue;
                };
                members.push(account.name);
            }
            entries.push(GroupMapEntry {
                name: group.name,
                members,
            });
        }

        if fetched < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }

    Ok(entries)
}

/// Write rendered export text to a file.
pub fn write_export(path: &Path, content: &str) -> HubResult<()> {
    std::fs::write(path, content)
        .map_err(|e| HubError::Internal(format!("failed to write {}: {e}", path.display())))
}

//! Matching incoming HR records against existing persons.

use idhub_core::error::{HubError, HubResult};
use idhub_core::models::external_id::ExternalIdType;
use idhub_core::models::person::Person;
use idhub_core::repository::PersonRepository;
use tracing::debug;

use crate::mapper::HrPerson;

/// Find the existing person an incoming record belongs to.
///
/// Each mapped external id is looked up in priority order (employee
/// number first, the source's own key last). All hits must agree on
/// one person; hits on two different persons fail the record with
/// [`HubError::AmbiguousMatch`] so an operator can untangle the ids,
/// rather than silently merging or duplicating people.
pub async fn find_candidate<P>(repo: &P, hr_person: &HrPerson) -> HubResult<Option<Person>>
where
    P: PersonRepository,
{
    let mut matched: Option<Person> = None;

    for id_type in ExternalIdType::all() {
        let Some(external_id) = hr_person
            .external_ids
            .iter()
            .find(|e| e.id_type == id_type)
        else {
            continue;
        };

        let Some(person) = repo
            .find_by_external_id(id_type, &external_id.value)
            .await?
        else {
            continue;
        };

        match &matched {
            None => {
                debug!(
                    hr_id = %hr_person.hr_id,
                    id_type = id_type.as_str(),
                    person_id = %person.id,
                    "matched existing person"
                );
                matched = Some(person);
            }
            Some(existing) if existing.id == person.id => {}
            Some(existing) => {
                return Err(HubError::AmbiguousMatch {
                    first: existing.id.to_string(),
                    second: person.id.to_string(),
                });
            }
        }
    }

    Ok(matched)
}

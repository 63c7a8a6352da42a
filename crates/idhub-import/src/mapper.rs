//! Translation of upstream HR values into hub types.
//!
//! The translation tables are plain data, mirroring how the source
//! system models its vocabulary. Unknown values are logged and
//! skipped rather than failing the whole record.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use idhub_core::models::affiliation::{AffiliationKind, AffiliationStatus};
use idhub_core::models::contact::{ContactInfo, ContactType};
use idhub_core::models::external_id::{ExternalId, ExternalIdType};
use idhub_core::models::person::Gender;
use tracing::debug;

use crate::datasource::{EmployeeBundle, IdentityData};

// identities.type -> external id type
const IDENTITY_TYPE_MAP: &[(&str, ExternalIdType)] = &[
    ("employee_number", ExternalIdType::EmployeeNumber),
    ("norwegian_national_id_number", ExternalIdType::NationalIdNumber),
    ("passport_number", ExternalIdType::PassportNumber),
];

// identities.type entries that are known but not identity documents
const IDENTITY_IGNORE_TYPES: &[&str] = &[
    "feide_id",
    "feide_email",
    "private_email",
    "private_mobile",
    "work_phone",
    "work_email",
];

// identities.type -> contact info type
const CONTACT_TYPE_MAP: &[(&str, ContactType)] = &[
    ("work_phone", ContactType::WorkPhone),
    ("private_mobile", ContactType::PrivateMobile),
    ("work_email", ContactType::WorkEmail),
];

// identities.type entries that are known but not contact channels
const CONTACT_IGNORE_TYPES: &[&str] = &[
    "feide_id",
    "feide_email",
    "private_email",
    "employee_number",
    "norwegian_national_id_number",
    "passport_number",
];

// accepted identities.verified values
const VERIFIED_VALUES: &[&str] = &["automatic", "manual"];

// roles.type -> affiliation status
const ROLE_TYPE_MAP: &[(&str, AffiliationStatus)] = &[
    ("emeritus", AffiliationStatus::Emeritus),
    ("guest-researcher", AffiliationStatus::GuestResearcher),
    ("external-partner", AffiliationStatus::ExternalPartner),
    ("external-consultant", AffiliationStatus::ExternalPartner),
];

/// Precedence assigned to the primary assignment.
const PRIMARY_PRECEDENCE: u16 = 50;

/// Map a source-side gender value.
pub fn map_gender(value: Option<&str>) -> Gender {
    match value {
        Some("Kvinne") => Gender::Female,
        Some("Mann") => Gender::Male,
        _ => Gender::Unknown,
    }
}

/// An affiliation as mapped from the feed, before the location code
/// is resolved to an org unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HrAffiliation {
    pub placecode: String,
    pub kind: AffiliationKind,
    pub status: AffiliationStatus,
    pub precedence: Option<u16>,
}

/// The mapped value object for one employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HrPerson {
    pub hr_id: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub reserved: bool,
    pub external_ids: BTreeSet<ExternalId>,
    pub affiliations: BTreeSet<HrAffiliation>,
    pub contacts: BTreeSet<ContactInfo>,
}

fn is_verified(identity: &IdentityData) -> bool {
    identity
        .verified
        .as_deref()
        .is_some_and(|v| VERIFIED_VALUES.contains(&v))
}

fn map_external_ids(hr_id: &str, identities: &[IdentityData]) -> BTreeSet<ExternalId> {
    let mut ids = BTreeSet::new();
    ids.insert(ExternalId::new(ExternalIdType::SourcePersonId, hr_id));

    for identity in identities {
        if IDENTITY_IGNORE_TYPES.contains(&identity.identity_type.as_str()) {
            continue;
        }
        let Some((_, id_type)) = IDENTITY_TYPE_MAP
            .iter()
            .find(|(name, _)| *name == identity.identity_type)
        else {
            debug!(
                hr_id,
                identity_type = %identity.identity_type,
                "ignoring unknown identity type"
            );
            continue;
        };
        if !is_verified(identity) {
            debug!(
                hr_id,
                identity_type = %identity.identity_type,
                "ignoring unverified identity"
            );
            continue;
        }
        ids.insert(ExternalId::new(*id_type, identity.value.clone()));
    }
    ids
}

fn map_contacts(hr_id: &str, identities: &[IdentityData]) -> BTreeSet<ContactInfo> {
    let mut contacts = BTreeSet::new();
    for identity in identities {
        if CONTACT_IGNORE_TYPES.contains(&identity.identity_type.as_str()) {
            continue;
        }
        let Some((_, contact_type)) = CONTACT_TYPE_MAP
            .iter()
            .find(|(name, _)| *name == identity.identity_type)
        else {
            debug!(
                hr_id,
                identity_type = %identity.identity_type,
                "ignoring unknown contact type"
            );
            continue;
        };
        if !is_verified(identity) {
            debug!(
                hr_id,
                identity_type = %identity.identity_type,
                "ignoring unverified contact entry"
            );
            continue;
        }
        // Repeated entries of the same type keep their feed order via
        // ascending preference.
        let preference = contacts
            .iter()
            .filter(|c: &&ContactInfo| c.contact_type == *contact_type)
            .count() as u16;
        contacts.insert(ContactInfo {
            contact_type: *contact_type,
            preference,
            value: identity.value.clone(),
        });
    }
    contacts
}

/// True when `today` falls inside the validity window.
fn window_active(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> bool {
    start.is_none_or(|s| s <= today) && end.is_none_or(|e| e >= today)
}

fn map_affiliations(bundle: &EmployeeBundle, today: NaiveDate) -> BTreeSet<HrAffiliation> {
    let hr_id = bundle.employee.person_id.as_str();
    let mut affiliations = BTreeSet::new();

    for assignment in &bundle.assignments {
        if !window_active(assignment.start_date, assignment.end_date, today) {
            debug!(
                hr_id,
                location_code = %assignment.location_code,
                "ignoring assignment outside its validity window"
            );
            continue;
        }
        let status = match assignment.job_category.as_str() {
            "academic" => AffiliationStatus::Academic,
            "administrative" => AffiliationStatus::TechAdmin,
            other => {
                debug!(hr_id, job_category = %other, "ignoring unknown job category");
                continue;
            }
        };
        affiliations.insert(HrAffiliation {
            placecode: assignment.location_code.clone(),
            kind: AffiliationKind::Employee,
            status,
            precedence: assignment.primary.then_some(PRIMARY_PRECEDENCE),
        });
    }

    for role in &bundle.roles {
        if !window_active(role.start_date, role.end_date, today) {
            debug!(
                hr_id,
                role_type = %role.role_type,
                "ignoring role outside its validity window"
            );
            continue;
        }
        let Some((_, status)) = ROLE_TYPE_MAP
            .iter()
            .find(|(name, _)| *name == role.role_type)
        else {
            debug!(hr_id, role_type = %role.role_type, "ignoring unknown role type");
            continue;
        };
        affiliations.insert(HrAffiliation {
            placecode: role.location_code.clone(),
            kind: status.kind(),
            status: *status,
            precedence: None,
        });
    }

    affiliations
}

/// Map a feed document to the hub value object.
///
/// `today` controls the assignment/role validity windows; inject a
/// fixed date in tests.
pub fn map_employee(bundle: &EmployeeBundle, today: NaiveDate) -> HrPerson {
    let employee = &bundle.employee;
    HrPerson {
        hr_id: employee.person_id.clone(),
        first_name: employee.first_name.clone().unwrap_or_default(),
        last_name: employee.last_name.clone().unwrap_or_default(),
        birth_date: employee.date_of_birth,
        gender: map_gender(employee.gender.as_deref()),
        reserved: employee.reserved,
        external_ids: map_external_ids(&employee.person_id, &employee.identities),
        affiliations: map_affiliations(bundle, today),
        contacts: map_contacts(&employee.person_id, &employee.identities),
    }
}

/// Whether the person is currently active in the source system.
///
/// False for tombstones, for incomplete registrations and for persons
/// with no assignment or role valid today.
pub fn is_active(bundle: &EmployeeBundle, today: NaiveDate) -> bool {
    if bundle.is_tombstone() {
        return false;
    }
    match bundle.employee.registration_completed_date {
        Some(completed) if completed <= today => {}
        _ => return false,
    }
    !map_affiliations(bundle, today).is_empty()
}

/// Future dates on which the person's active state may change: every
/// future start date and the day after every current-or-future end
/// date. The earliest drives the reschedule.
pub fn retry_dates(bundle: &EmployeeBundle, today: NaiveDate) -> BTreeSet<NaiveDate> {
    let mut dates = BTreeSet::new();

    let windows = bundle
        .assignments
        .iter()
        .map(|a| (a.start_date, a.end_date))
        .chain(bundle.roles.iter().map(|r| (r.start_date, r.end_date)));

    for (start, end) in windows {
        if let Some(start) = start
            && start > today
        {
            dates.insert(start);
        }
        if let Some(end) = end
            && end >= today
            && let Some(day_after) = end.checked_add_days(Days::new(1))
        {
            dates.insert(day_after);
        }
    }

    if let Some(completed) = bundle.employee.registration_completed_date
        && completed > today
    {
        dates.insert(completed);
    }

    dates
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::datasource::parse_employee;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_bundle() -> EmployeeBundle {
        parse_employee(
            br#"{
            "person_id": "1001",
            "first_name": "Kari",
            "last_name": "Nordmann",
            "gender": "Kvinne",
            "registration_completed_date": "2026-01-10",
            "identities": [
                {"type": "employee_number", "verified": "automatic",
                 "value": "123456"},
                {"type": "passport_number", "verified": "manual",
                 "value": "NO-X1234567"},
                {"type": "passport_number", "value": "NO-UNVERIFIED"},
                {"type": "feide_id", "verified": "automatic",
                 "value": "kari@example.org"},
                {"type": "private_mobile", "verified": "automatic",
                 "value": "20123456"},
                {"type": "work_email", "verified": "manual",
                 "value": "kari@work.example.org"}
            ],
            "assignments": [
                {"location_code": "332211", "job_category": "academic",
                 "primary": true,
                 "start_date": "2026-01-01", "end_date": "2026-12-31"},
                {"location_code": "112233",
                 "job_category": "administrative",
                 "start_date": "2026-09-01"}
            ],
            "roles": [
                {"type": "guest-researcher", "location_code": "445566",
                 "start_date": "2025-01-01", "end_date": "2026-06-30"},
                {"type": "unknown-role", "location_code": "445566"}
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn gender_mapping() {
        assert_eq!(map_gender(Some("Kvinne")), Gender::Female);
        assert_eq!(map_gender(Some("Mann")), Gender::Male);
        assert_eq!(map_gender(Some("other")), Gender::Unknown);
        assert_eq!(map_gender(None), Gender::Unknown);
    }

    #[test]
    fn external_ids_include_source_pid_and_verified_documents() {
        let person = map_employee(&sample_bundle(), date(2026, 3, 1));

        let expected: BTreeSet<_> = [
            ExternalId::new(ExternalIdType::SourcePersonId, "1001"),
            ExternalId::new(ExternalIdType::EmployeeNumber, "123456"),
            ExternalId::new(ExternalIdType::PassportNumber, "NO-X1234567"),
        ]
        .into_iter()
        .collect();
        assert_eq!(person.external_ids, expected);
    }

    #[test]
    fn contacts_are_mapped_and_filtered() {
        let person = map_employee(&sample_bundle(), date(2026, 3, 1));

        let expected: BTreeSet<_> = [
            ContactInfo {
                contact_type: ContactType::PrivateMobile,
                preference: 0,
                value: "20123456".into(),
            },
            ContactInfo {
                contact_type: ContactType::WorkEmail,
                preference: 0,
                value: "kari@work.example.org".into(),
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(person.contacts, expected);
    }

    #[test]
    fn affiliations_respect_validity_windows() {
        // March: first assignment and the guest role are active, the
        // September assignment has not started.
        let person = map_employee(&sample_bundle(), date(2026, 3, 1));
        let expected: BTreeSet<_> = [
            HrAffiliation {
                placecode: "332211".into(),
                kind: AffiliationKind::Employee,
                status: AffiliationStatus::Academic,
                precedence: Some(50),
            },
            HrAffiliation {
                placecode: "445566".into(),
                kind: AffiliationKind::Associate,
                status: AffiliationStatus::GuestResearcher,
                precedence: None,
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(person.affiliations, expected);

        // October: the guest role has expired, the second assignment
        // has started.
        let person = map_employee(&sample_bundle(), date(2026, 10, 1));
        assert_eq!(person.affiliations.len(), 2);
        assert!(
            person
                .affiliations
                .iter()
                .any(|a| a.placecode == "112233"
                    && a.status == AffiliationStatus::TechAdmin
                    && a.precedence.is_none())
        );
    }

    #[test]
    fn active_state() {
        let bundle = sample_bundle();
        assert!(is_active(&bundle, date(2026, 3, 1)));

        // Before registration completed.
        assert!(!is_active(&bundle, date(2026, 1, 5)));

        // After everything has expired.
        assert!(!is_active(&bundle, date(2027, 6, 1)));

        // Tombstones are never active.
        assert!(!is_active(
            &EmployeeBundle::tombstone("1001"),
            date(2026, 3, 1)
        ));
    }

    #[test]
    fn registration_date_is_required() {
        let bundle = parse_employee(
            br#"{
            "person_id": "1002",
            "first_name": "Ola",
            "last_name": "Hansen",
            "assignments": [
                {"location_code": "332211", "job_category": "academic"}
            ]
        }"#,
        )
        .unwrap();
        assert!(!is_active(&bundle, date(2026, 3, 1)));
    }

    #[test]
    fn retry_dates_cover_future_changes() {
        let dates = retry_dates(&sample_bundle(), date(2026, 3, 1));
        let expected: BTreeSet<_> = [
            date(2026, 9, 1),  // second assignment starts
            date(2027, 1, 1),  // first assignment ends Dec 31
            date(2026, 7, 1),  // guest role ends Jun 30
        ]
        .into_iter()
        .collect();
        assert_eq!(dates, expected);
        assert_eq!(dates.first(), Some(&date(2026, 7, 1)));
    }

    #[test]
    fn no_retry_dates_when_everything_is_past() {
        let dates = retry_dates(&sample_bundle(), date(2027, 6, 1));
        assert!(dates.is_empty());
    }
}

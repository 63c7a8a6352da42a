//! Domain models for idhub.
//!
//! These are the canonical entity types shared across all crates.
//! Source-system records (external ids, affiliations, contact info,
//! quarantines) carry the [`source::SourceSystem`] they came from, so
//! that each upstream feed only ever touches its own rows.

pub mod account;
pub mod affiliation;
pub mod audit;
pub mod contact;
pub mod external_id;
pub mod group;
pub mod org_unit;
pub mod person;
pub mod quarantine;
pub mod source;
pub mod task;

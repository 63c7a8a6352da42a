//! Derived flat-file views of hub data.
//!
//! Exports are read-only: they gather state through the repository
//! traits, render deterministic text and optionally write it to a
//! file. Downstream consumers diff consecutive runs, so output order
//! must be stable.

pub mod feed;

pub use feed::{
    GroupMapEntry, PersonFeedEntry, build_group_map, build_person_feed, group_map, person_feed,
    write_export,
};

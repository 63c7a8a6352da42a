//! idhub core — canonical entity model and repository traits.
//!
//! The hub ingests person records from upstream HR/student systems,
//! normalizes them into the entity model defined here, and exposes
//! the data through repository traits implemented by `idhub-db`.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{HubError, HubResult};

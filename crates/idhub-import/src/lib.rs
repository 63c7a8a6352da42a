//! HR import reconciliation pipeline.
//!
//! Four stages: parse the upstream feed ([`datasource`]), translate
//! source values into hub types ([`mapper`]), match the incoming
//! record against existing persons ([`matcher`]), then create, update
//! or remove through the repositories ([`importer`]). Records whose
//! active state changes on a future date are rescheduled through the
//! task queue ([`tasks`]).

pub mod datasource;
pub mod importer;
pub mod mapper;
pub mod matcher;
pub mod tasks;

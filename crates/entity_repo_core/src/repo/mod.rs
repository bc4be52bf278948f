//! Repository layer: generic CRUD over entities.
//!
//! # Responsibility
//! - Translate filters and patches into SQL against entity tables.
//! - Run every operation inside a provider-supplied session.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `UnknownAttribute`,
//!   `CouldNotCreate`, `CouldNotDelete`) in addition to DB transport errors.

pub mod entity_repo;
pub mod error;
pub mod ext;
pub mod log_fields;
pub mod query;

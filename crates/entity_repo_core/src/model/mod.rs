//! Entity contract shared by every repository.
//!
//! # Responsibility
//! - Describe how a persisted record type maps onto one SQLite table.
//! - Reject malformed declarations before any SQL is built from them.
//!
//! # Invariants
//! - Every entity table has an integer primary key named `id`.
//! - Identifiers embedded in SQL come only from validated declarations.

pub mod entity;

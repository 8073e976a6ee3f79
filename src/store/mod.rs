//! Storage is organized through [document_store::DocumentStore].
//! The basic idea is:
//!   - All clients and projects live in memory inside one [database::Database] document.
//!   - Every mutation writes the complete document through a
//!     [persistence::PersistenceAdapter] before it becomes visible.
//!   - Deleting a client unassigns its projects in the same write.

pub mod database;
pub mod document_store;
pub mod entities;
pub mod persistence;
pub mod seed;

pub use document_store::DocumentStore;

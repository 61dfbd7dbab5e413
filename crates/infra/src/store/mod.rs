//! Transactional storage.
//!
//! Every service operation runs inside exactly one [`UnitOfWork`]; nothing is
//! visible to other callers until `commit`. Dropping a unit of work without
//! committing discards its writes.

mod in_memory;
mod postgres;
mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{NewParticipantRecord, Store, StoreError, UnitOfWork};

//! Infrastructure layer: transactional storage and the application services
//! that drive the domain rules through it.

pub mod services;
pub mod store;


pub use services::{ServiceError, Services};
pub use store::{InMemoryStore, PostgresStore, Store, StoreError, UnitOfWork};

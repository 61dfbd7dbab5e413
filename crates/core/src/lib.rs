//! `bookstore-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod pagination;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CartItemId, Isbn, OrderDetailId, OrderId, ParticipantId};
pub use money::Price;
pub use pagination::Page;
pub use value_object::ValueObject;

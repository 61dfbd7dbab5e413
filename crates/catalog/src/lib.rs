//! Catalog domain module: books, their owning store, and stock on hand.
//!
//! Pure domain logic. The inventory counter is the single source of truth for
//! availability; see [`inventory`] for the only legal ways to move it.

pub mod book;
pub mod inventory;
pub mod search;

pub use book::{Book, BookChanges, NewBook};
pub use inventory::{ensure_available, restore, take, validate_quantity};
pub use search::{BookQuery, TextMatch};

//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// stock, ownership, conflicts). Storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, missing update fields).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The entity is absent, or not visible to the caller.
    #[error("{0} not found")]
    NotFound(String),

    /// Authenticated, but a role or ownership check failed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Missing, malformed or expired credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Requested quantity exceeds the stock on hand.
    #[error("insufficient inventory for book {isbn}: requested {requested}, available {available}")]
    InsufficientInventory {
        isbn: String,
        requested: u32,
        available: u32,
    },

    /// Checkout was requested for a cart with no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A unique key already exists.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn insufficient_inventory(isbn: impl Into<String>, requested: u32, available: u32) -> Self {
        Self::InsufficientInventory {
            isbn: isbn.into(),
            requested,
            available,
        }
    }
}

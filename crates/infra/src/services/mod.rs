//! Application services.
//!
//! Every public operation follows the same shape:
//!
//! ```text
//! validate input (pure, no IO)
//!   ↓
//! begin unit of work
//!   ↓
//! authorize + read + check invariants + write   (free fn over &mut dyn UnitOfWork)
//!   ↓
//! commit on Ok / rollback on Err
//! ```
//!
//! Password hashing happens before the unit of work opens, so no transaction
//! is held open across it.

use std::sync::Arc;

use thiserror::Error;

use bookstore_auth::{AuthzError, PasswordError, PasswordService, TokenError, TokenService};
use bookstore_core::DomainError;

use crate::store::{Store, StoreError, UnitOfWork};

mod cart;
mod catalog;
mod directory;
mod orders;
mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use session::Session;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deterministic business failure; safe to show to the caller.
    #[error(transparent)]
    Domain(DomainError),

    /// Storage failure; log it, never show it.
    #[error("store error: {0}")]
    Store(StoreError),

    #[error("password hashing failed: {0}")]
    Password(#[from] PasswordError),

    #[error("token issuance failed: {0}")]
    Token(#[from] TokenError),
}

impl ServiceError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        ServiceError::Domain(value)
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        ServiceError::Domain(value.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::UniqueViolation(msg) => ServiceError::Domain(DomainError::conflict(msg)),
            StoreError::ForeignKeyViolation(msg) => {
                tracing::debug!(%msg, "delete blocked by a reference");
                ServiceError::Domain(DomainError::conflict("Record is still referenced"))
            }
            StoreError::Contention(msg) => {
                tracing::warn!(%msg, "unit of work lost a lock race");
                ServiceError::Domain(DomainError::conflict(
                    "Concurrent update conflict, retry the request",
                ))
            }
            other => ServiceError::Store(other),
        }
    }
}

/// Shared handle to the application services. Cheap to clone.
#[derive(Clone)]
pub struct Services {
    store: Arc<dyn Store>,
    tokens: Arc<dyn TokenService>,
    passwords: Arc<dyn PasswordService>,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Self {
        Self {
            store,
            tokens,
            passwords,
        }
    }
}

/// Commit on success, roll back on failure. A failed rollback is logged and
/// the original error wins.
async fn finish<T>(uow: Box<dyn UnitOfWork>, result: Result<T, ServiceError>) -> Result<T, ServiceError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_races_and_references_surface_as_conflicts() {
        let err = ServiceError::from(StoreError::Contention("deadlock detected".into()));
        assert!(matches!(err.domain(), Some(DomainError::Conflict(msg)) if msg.contains("retry")));

        let err = ServiceError::from(StoreError::ForeignKeyViolation("fk_order_details".into()));
        assert!(matches!(err.domain(), Some(DomainError::Conflict(msg)) if !msg.contains("fk_")));

        let err = ServiceError::from(StoreError::Backend("connection reset".into()));
        assert!(matches!(err, ServiceError::Store(StoreError::Backend(_))));
    }
}

use thiserror::Error;

use bookstore_core::{DomainError, ParticipantId};

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("requires participant type '{required}', caller is '{actual}'")]
    WrongRole { required: Role, actual: Role },

    #[error("participant {caller} does not own this resource")]
    NotOwner { caller: ParticipantId },
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::forbidden(value.to_string())
    }
}

/// A single access predicate.
///
/// Roles are flat (no hierarchy); the administrator satisfies every
/// ownership-style requirement but not `Role(Buyer)` / `Role(Store)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Caller must be exactly this participant type.
    Role(Role),
    /// Caller is the owner, or an administrator.
    OwnerOrAdmin(ParticipantId),
    /// Caller is the store that owns the resource, or an administrator.
    StoreOwnerOrAdmin(ParticipantId),
    /// Caller is the order's buyer, the order's store, or an administrator.
    OrderViewer {
        buyer: ParticipantId,
        store: ParticipantId,
    },
}

/// Evaluate a requirement against a resolved principal.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: Requirement) -> Result<(), AuthzError> {
    let not_owner = || AuthzError::NotOwner {
        caller: principal.id,
    };

    match required {
        Requirement::Role(role) => {
            if principal.role == role {
                Ok(())
            } else {
                Err(AuthzError::WrongRole {
                    required: role,
                    actual: principal.role,
                })
            }
        }
        Requirement::OwnerOrAdmin(owner) => match principal.role {
            Role::Administrator => Ok(()),
            Role::Buyer | Role::Store if principal.id == owner => Ok(()),
            Role::Buyer | Role::Store => Err(not_owner()),
        },
        Requirement::StoreOwnerOrAdmin(store) => match principal.role {
            Role::Administrator => Ok(()),
            Role::Store if principal.id == store => Ok(()),
            Role::Store | Role::Buyer => Err(not_owner()),
        },
        Requirement::OrderViewer { buyer, store } => match principal.role {
            Role::Administrator => Ok(()),
            Role::Buyer if principal.id == buyer => Ok(()),
            Role::Store if principal.id == store => Ok(()),
            Role::Buyer | Role::Store => Err(not_owner()),
        },
    }
}

pub fn require_role(principal: &Principal, role: Role) -> Result<&Principal, AuthzError> {
    authorize(principal, Requirement::Role(role)).map(|()| principal)
}

pub fn require_owner_or_admin(
    principal: &Principal,
    owner: ParticipantId,
) -> Result<&Principal, AuthzError> {
    authorize(principal, Requirement::OwnerOrAdmin(owner)).map(|()| principal)
}

pub fn require_store_owner_or_admin(
    principal: &Principal,
    store: ParticipantId,
) -> Result<&Principal, AuthzError> {
    authorize(principal, Requirement::StoreOwnerOrAdmin(store)).map(|()| principal)
}

pub fn require_order_viewer(
    principal: &Principal,
    buyer: ParticipantId,
    store: ParticipantId,
) -> Result<&Principal, AuthzError> {
    authorize(principal, Requirement::OrderViewer { buyer, store }).map(|()| principal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: i64, role: Role) -> Principal {
        Principal::new(ParticipantId::new(id), format!("p{id}"), role)
    }

    #[test]
    fn role_check_is_exact() {
        let store = principal(1, Role::Store);
        assert!(require_role(&store, Role::Store).is_ok());
        assert_eq!(
            require_role(&store, Role::Buyer),
            Err(AuthzError::WrongRole {
                required: Role::Buyer,
                actual: Role::Store
            })
        );

        let admin = principal(2, Role::Administrator);
        assert!(require_role(&admin, Role::Store).is_err());
    }

    #[test]
    fn owner_or_admin() {
        let me = principal(7, Role::Buyer);
        assert!(require_owner_or_admin(&me, ParticipantId::new(7)).is_ok());
        assert!(require_owner_or_admin(&me, ParticipantId::new(8)).is_err());

        let admin = principal(1, Role::Administrator);
        assert!(require_owner_or_admin(&admin, ParticipantId::new(8)).is_ok());
    }

    #[test]
    fn store_owner_must_be_a_store() {
        let store = principal(3, Role::Store);
        assert!(require_store_owner_or_admin(&store, ParticipantId::new(3)).is_ok());
        assert!(require_store_owner_or_admin(&store, ParticipantId::new(4)).is_err());

        // A buyer whose id happens to equal the store id is still not the store.
        let buyer = principal(3, Role::Buyer);
        assert!(require_store_owner_or_admin(&buyer, ParticipantId::new(3)).is_err());
    }

    #[test]
    fn order_visibility_boundary() {
        let buyer = ParticipantId::new(10);
        let store = ParticipantId::new(20);

        assert!(require_order_viewer(&principal(10, Role::Buyer), buyer, store).is_ok());
        assert!(require_order_viewer(&principal(20, Role::Store), buyer, store).is_ok());
        assert!(require_order_viewer(&principal(1, Role::Administrator), buyer, store).is_ok());

        assert!(require_order_viewer(&principal(11, Role::Buyer), buyer, store).is_err());
        assert!(require_order_viewer(&principal(21, Role::Store), buyer, store).is_err());
        assert!(require_order_viewer(&principal(20, Role::Buyer), buyer, store).is_err());
    }

    #[test]
    fn converts_to_forbidden_domain_error() {
        let err: DomainError = AuthzError::NotOwner {
            caller: ParticipantId::new(5),
        }
        .into();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}

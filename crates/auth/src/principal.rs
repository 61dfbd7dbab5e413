use serde::{Deserialize, Serialize};

use bookstore_core::ParticipantId;

use crate::Role;

/// A fully resolved caller identity.
///
/// Built by the session layer after the token signature, the time window and
/// the directory lookup have all succeeded. Guards take this by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: ParticipantId,
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: ParticipantId, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Administrator)
    }
}

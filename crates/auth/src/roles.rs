use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bookstore_core::DomainError;

/// Participant type. Closed set; guards match on it exhaustively.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Store,
    Administrator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Buyer, Role::Store, Role::Administrator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Store => "store",
            Role::Administrator => "administrator",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Role::Buyer),
            "store" => Ok(Role::Store),
            "administrator" => Ok(Role::Administrator),
            other => Err(DomainError::validation(format!(
                "invalid participant type '{other}', expected one of buyer, store, administrator"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively_and_rejects_unknown() {
        assert_eq!("Store".parse::<Role>().unwrap(), Role::Store);
        assert_eq!(" administrator ".parse::<Role>().unwrap(), Role::Administrator);
        assert!(matches!("admin".parse::<Role>(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::Buyer).unwrap(), "\"buyer\"");
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }
}

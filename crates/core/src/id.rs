//! Strongly-typed identifiers used across the domain.
//!
//! Row identifiers are store-assigned serial integers; books are keyed by ISBN.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Identifier of a participant (buyer, store or administrator).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(i64);

/// Identifier of a cart line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartItemId(i64);

/// Identifier of an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

/// Identifier of an order detail line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderDetailId(i64);

macro_rules! impl_serial_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = i64::from_str(s.trim())
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                if value <= 0 {
                    return Err(DomainError::invalid_id(format!("{}: must be positive", $name)));
                }
                Ok(Self(value))
            }
        }
    };
}

impl_serial_newtype!(ParticipantId, "ParticipantId");
impl_serial_newtype!(CartItemId, "CartItemId");
impl_serial_newtype!(OrderId, "OrderId");
impl_serial_newtype!(OrderDetailId, "OrderDetailId");

/// Maximum ISBN length accepted by the catalog table.
pub const ISBN_MAX_LEN: usize = 20;

/// Book key. Free-form (ISBN-10, ISBN-13, hyphenated or not), trimmed, non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("Isbn: cannot be empty"));
        }
        if trimmed.chars().count() > ISBN_MAX_LEN {
            return Err(DomainError::invalid_id(format!(
                "Isbn: longer than {ISBN_MAX_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Isbn {}

impl core::fmt::Display for Isbn {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Isbn {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Isbn {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Isbn> for String {
    fn from(value: Isbn) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_ids_parse_positive_integers_only() {
        assert_eq!("42".parse::<OrderId>().unwrap(), OrderId::new(42));
        assert!(matches!("0".parse::<OrderId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("-3".parse::<ParticipantId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("abc".parse::<CartItemId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn isbn_is_trimmed_and_bounded() {
        let isbn = Isbn::parse("  978-0131103627 ").unwrap();
        assert_eq!(isbn.as_str(), "978-0131103627");

        assert!(Isbn::parse("   ").is_err());
        assert!(Isbn::parse("1".repeat(ISBN_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn isbn_deserialization_validates() {
        let ok: Isbn = serde_json::from_str("\"0131103628\"").unwrap();
        assert_eq!(ok.to_string(), "0131103628");

        let err = serde_json::from_str::<Isbn>("\"\"");
        assert!(err.is_err());
    }
}

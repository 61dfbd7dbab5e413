use serde::{Deserialize, Serialize};

use bookstore_catalog::validate_quantity;
use bookstore_core::{CartItemId, DomainError, DomainResult, Entity, Isbn, ParticipantId, Price};

use crate::checkout::PricedLine;

/// Stored cart row. At most one per (user, isbn).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: ParticipantId,
    #[serde(rename = "book_isbn")]
    pub isbn: Isbn,
    pub quantity: u32,
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Cart row joined with current book and store metadata at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartItemId,
    #[serde(rename = "book_isbn")]
    pub isbn: Isbn,
    pub quantity: u32,
    pub book_name: String,
    pub authors: String,
    pub price: Price,
    pub inventory: u32,
    pub store_id: ParticipantId,
    pub store_name: String,
}

impl CartLine {
    pub fn priced(&self) -> PricedLine {
        PricedLine {
            isbn: self.isbn.clone(),
            quantity: self.quantity,
            unit_price: self.price,
            store_id: self.store_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCart {
    #[serde(alias = "book_isbn")]
    pub isbn: Isbn,
    pub quantity: u32,
}

/// Quantity after adding `added` to an existing line (or starting a new one).
pub fn merge_quantity(existing: Option<u32>, added: u32) -> DomainResult<u32> {
    validate_quantity(added)?;
    existing
        .unwrap_or(0)
        .checked_add(added)
        .ok_or_else(|| DomainError::validation("cart quantity is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merging_adds_to_existing_line() {
        assert_eq!(merge_quantity(Some(2), 3), Ok(5));
        assert_eq!(merge_quantity(None, 3), Ok(3));
    }

    #[test]
    fn merging_rejects_zero_and_overflow() {
        assert!(merge_quantity(Some(2), 0).is_err());
        assert!(merge_quantity(Some(u32::MAX), 1).is_err());
    }
}

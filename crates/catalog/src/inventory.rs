//! Stock movements.
//!
//! Inventory only moves through [`take`] (order placement) and [`restore`]
//! (order cancellation); both refuse to leave the counter outside `0..=u32::MAX`.

use bookstore_core::{DomainError, DomainResult};

use crate::Book;

/// Requested quantities must be strictly positive.
pub fn validate_quantity(quantity: u32) -> DomainResult<u32> {
    if quantity == 0 {
        return Err(DomainError::validation("quantity must be greater than zero"));
    }
    Ok(quantity)
}

/// Advisory check against the current counter; reserves nothing.
pub fn ensure_available(book: &Book, requested: u32) -> DomainResult<()> {
    if requested > book.inventory {
        return Err(DomainError::insufficient_inventory(
            book.isbn.as_str(),
            requested,
            book.inventory,
        ));
    }
    Ok(())
}

/// Decrement stock, or fail without touching it.
pub fn take(book: &mut Book, quantity: u32) -> DomainResult<u32> {
    let remaining = book.inventory.checked_sub(quantity).ok_or_else(|| {
        DomainError::insufficient_inventory(book.isbn.as_str(), quantity, book.inventory)
    })?;
    book.inventory = remaining;
    Ok(remaining)
}

/// Put stock back (cancellation).
pub fn restore(book: &mut Book, quantity: u32) -> DomainResult<u32> {
    let restored = book.inventory.checked_add(quantity).ok_or_else(|| {
        DomainError::validation(format!("inventory overflow for book {}", book.isbn))
    })?;
    book.inventory = restored;
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_core::{Isbn, ParticipantId, Price};
    use proptest::prelude::*;

    fn book(inventory: u32) -> Book {
        Book {
            isbn: Isbn::parse("111").unwrap(),
            name: "Dune".into(),
            authors: "Herbert".into(),
            category: None,
            inventory,
            price: Price::ZERO,
            store_id: ParticipantId::new(1),
            image_url: None,
        }
    }

    #[test]
    fn zero_quantity_is_invalid() {
        assert!(validate_quantity(0).is_err());
        assert_eq!(validate_quantity(3), Ok(3));
    }

    #[test]
    fn take_refuses_to_go_negative_and_leaves_stock_untouched() {
        let mut b = book(2);
        let err = take(&mut b, 3).unwrap_err();
        assert_eq!(err, DomainError::insufficient_inventory("111", 3, 2));
        assert_eq!(b.inventory, 2);

        assert_eq!(take(&mut b, 2), Ok(0));
    }

    #[test]
    fn ensure_available_is_inclusive() {
        assert!(ensure_available(&book(5), 5).is_ok());
        assert!(ensure_available(&book(5), 6).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn take_then_restore_is_identity(start in 0u32..10_000, qty in 1u32..10_000) {
            let mut b = book(start);
            match take(&mut b, qty) {
                Ok(_) => {
                    restore(&mut b, qty).unwrap();
                    prop_assert_eq!(b.inventory, start);
                }
                Err(_) => prop_assert_eq!(b.inventory, start),
            }
        }
    }
}

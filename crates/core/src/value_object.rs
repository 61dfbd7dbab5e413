//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**. Two ISBNs or two prices with the same
//! contents are the same thing, whereas two participants with the same name are
//! not (the directory enforces uniqueness separately).

/// Marker trait for value objects.
///
/// Value objects are immutable once constructed. Constructors validate, so a
/// value that exists is a value that is valid (`Isbn::parse`, `Price::new`).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Ids are ordered so stores can keep entities in insertion (serial) order.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

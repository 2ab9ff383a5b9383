//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stock items, models, and orders are entities: two instances with the same
/// identifier are the same thing regardless of their current field values.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

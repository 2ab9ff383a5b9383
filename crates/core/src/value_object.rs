//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable domain values compared by their attributes;
/// they carry no identity of their own. A counter snapshot, a customer block
/// on an order, or a price card are value objects; the stock item that owns
/// them is an entity.
///
/// To "modify" a value object, build a new one. This keeps them safe to
/// copy across threads and trivially comparable in tests.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

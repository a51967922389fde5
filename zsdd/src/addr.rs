//! Node addresses and their reserved sentinel values.

/// A node address. Non-negative values index into the manager's node arena;
/// the three negative values below are reserved sentinels and are never
/// allocated a slot.
pub type Address = i64;

/// The family `{∅}` — containing only the empty set. Multiplicative
/// identity of [`crate::cache::Op::OrthogonalJoin`], additive "one"
/// for counting.
pub const EMPTY: Address = -1;

/// The empty family `∅`. Additive identity of
/// [`crate::cache::Op::Union`].
pub const FALSE: Address = -2;

/// Cache miss / no value. Never a valid diagram.
pub const NULL: Address = -3;

/// True for the three reserved sentinel addresses.
#[inline]
pub fn is_sentinel(addr: Address) -> bool {
    addr < 0
}

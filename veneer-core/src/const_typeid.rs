//! Forked from <https://github.com/dtolnay/typeid>

#![allow(clippy::inline_always)]

use core::any::TypeId;
use core::cmp::Ordering;
use core::fmt::{self, Debug};
use core::hash::{Hash, Hasher};

/// TypeId equivalent usable in const contexts.
///
/// `TypeId::of` is not a `const fn` on stable, so this stores the function
/// pointer instead and defers the call to runtime. The function pointer is
/// unique per type within a process.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct ConstTypeId {
    type_id_fn: fn() -> TypeId,
}

impl ConstTypeId {
    /// Create a [`ConstTypeId`] for a type.
    #[must_use]
    pub const fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        ConstTypeId {
            type_id_fn: TypeId::of::<T>,
        }
    }

    /// Get the underlying [`TypeId`] for this `ConstTypeId`.
    #[inline]
    pub fn get(self) -> TypeId {
        (self.type_id_fn)()
    }
}

impl Debug for ConstTypeId {
    #[inline]
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.get(), formatter)
    }
}

impl PartialEq for ConstTypeId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl PartialEq<TypeId> for ConstTypeId {
    #[inline]
    fn eq(&self, other: &TypeId) -> bool {
        self.get() == *other
    }
}

impl Eq for ConstTypeId {}

impl PartialOrd for ConstTypeId {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(Ord::cmp(self, other))
    }
}

impl Ord for ConstTypeId {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        Ord::cmp(&self.get(), &other.get())
    }
}

impl Hash for ConstTypeId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the function pointer directly - much faster than calling it
        // to get TypeId. The function pointer is unique per type within a process.
        (self.type_id_fn as usize).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_matches_type_id() {
        const STRING_ID: ConstTypeId = ConstTypeId::of::<alloc::string::String>();
        assert_eq!(STRING_ID.get(), TypeId::of::<alloc::string::String>());
        assert_eq!(STRING_ID, ConstTypeId::of::<alloc::string::String>());
        assert_ne!(ConstTypeId::of::<u8>(), ConstTypeId::of::<i8>());
    }
}

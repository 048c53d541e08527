//! Storage policies
//!
//! A storage policy decides how a proxy owns the erased value: on the
//! heap, inline, shared, borrowed, or not at all. Policies expose erased
//! pointers and the value's [`TypeInfo`]; the dispatch layer never sees
//! the concrete type again after construction.

use veneer_core::{PtrConst, PtrMut, TypeInfo};

mod block;
mod borrowed;
mod chain;
mod inline;
mod shared;
mod slot;
mod unique;
mod value;

pub(crate) use block::OwnedBlock;
pub use borrowed::{BorrowedMutStorage, BorrowedStorage};
pub use chain::{ChainStorage, SmallStorage};
pub use inline::InlineStorage;
pub use shared::{LocalCount, RefCount, SharedStorage, SyncCount};
pub use slot::SlotStorage;
pub use unique::BoxStorage;
pub use value::ValueStorage;

/// Common surface of every storage policy.
///
/// A storage is either empty or holds exactly one erased value; the
/// accessors return `None` when empty. Policies that cannot hand out
/// exclusive access (shared ownership, shared borrows) return `None` from
/// [`Storage::as_ptr_mut`] even when populated.
pub trait Storage: Sized {
    /// A storage holding nothing.
    fn empty() -> Self;

    /// Shared access to the stored value.
    fn as_ptr(&self) -> Option<PtrConst<'_>>;

    /// Exclusive access to the stored value.
    fn as_ptr_mut(&mut self) -> Option<PtrMut<'_>>;

    /// Descriptor of the stored value's concrete type.
    fn type_info(&self) -> Option<&'static TypeInfo>;

    /// Destroys the stored value (releases the reference, for shared
    /// policies) and leaves the storage empty.
    fn reset(&mut self);

    /// Moves the stored value into a fresh storage, leaving this one
    /// empty.
    fn take(&mut self) -> Self;
}

/// A storage policy that is the sole owner of its value.
///
/// Required for consuming dispatch, where the value is destroyed after
/// the call returns.
pub trait ExclusiveStorage: Storage {
    /// Forgets the stored value without running its destructor, releasing
    /// any backing allocation. Leaves the storage empty.
    fn discard(&mut self);
}

/// Construction of a storage policy from a concrete value.
pub trait StoreValue<T>: Storage {
    /// Takes ownership of `value` (or borrows into it, for non-owning
    /// policies constructed elsewhere).
    fn store(value: T) -> Self;
}

/// Fallible construction, for policies with acceptance criteria the type
/// system cannot express (an inline fit check at runtime, say).
pub trait TryStoreValue<T>: Storage {
    /// Attempts to take ownership of `value`, handing it back on refusal.
    fn try_store(value: T) -> Result<Self, T>;
}

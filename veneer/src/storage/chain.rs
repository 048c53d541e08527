//! Composed storage: try one policy, fall back to another.

use veneer_core::{PtrConst, PtrMut, TypeInfo};

use super::{
    BoxStorage, ExclusiveStorage, InlineStorage, Storage, StoreValue, TryStoreValue,
};

/// Stores through `A` when it accepts the value, through `B` otherwise.
///
/// The workhorse composition is [`SmallStorage`]: inline buffer first,
/// heap fallback.
pub enum ChainStorage<A, B> {
    /// The primary policy accepted the value.
    First(A),
    /// The fallback policy holds the value.
    Second(B),
    /// Nothing stored.
    Empty,
}

/// Small-buffer-optimized storage: values fitting `Space` live inline,
/// anything bigger spills to the heap.
pub type SmallStorage<Space = [usize; 3]> = ChainStorage<InlineStorage<Space>, BoxStorage>;

impl<A: Storage, B: Storage> Storage for ChainStorage<A, B> {
    fn empty() -> Self {
        ChainStorage::Empty
    }

    fn as_ptr(&self) -> Option<PtrConst<'_>> {
        match self {
            ChainStorage::First(a) => a.as_ptr(),
            ChainStorage::Second(b) => b.as_ptr(),
            ChainStorage::Empty => None,
        }
    }

    fn as_ptr_mut(&mut self) -> Option<PtrMut<'_>> {
        match self {
            ChainStorage::First(a) => a.as_ptr_mut(),
            ChainStorage::Second(b) => b.as_ptr_mut(),
            ChainStorage::Empty => None,
        }
    }

    fn type_info(&self) -> Option<&'static TypeInfo> {
        match self {
            ChainStorage::First(a) => a.type_info(),
            ChainStorage::Second(b) => b.type_info(),
            ChainStorage::Empty => None,
        }
    }

    fn reset(&mut self) {
        *self = ChainStorage::Empty;
    }

    fn take(&mut self) -> Self {
        core::mem::replace(self, ChainStorage::Empty)
    }
}

impl<A: ExclusiveStorage, B: ExclusiveStorage> ExclusiveStorage for ChainStorage<A, B> {
    fn discard(&mut self) {
        match self {
            ChainStorage::First(a) => a.discard(),
            ChainStorage::Second(b) => b.discard(),
            ChainStorage::Empty => {}
        }
        *self = ChainStorage::Empty;
    }
}

impl<A: Clone, B: Clone> Clone for ChainStorage<A, B> {
    fn clone(&self) -> Self {
        match self {
            ChainStorage::First(a) => ChainStorage::First(a.clone()),
            ChainStorage::Second(b) => ChainStorage::Second(b.clone()),
            ChainStorage::Empty => ChainStorage::Empty,
        }
    }
}

impl<T, A, B> StoreValue<T> for ChainStorage<A, B>
where
    A: TryStoreValue<T>,
    B: StoreValue<T>,
{
    fn store(value: T) -> Self {
        match A::try_store(value) {
            Ok(a) => ChainStorage::First(a),
            Err(value) => ChainStorage::Second(B::store(value)),
        }
    }
}

impl<T, A, B> TryStoreValue<T> for ChainStorage<A, B>
where
    A: TryStoreValue<T>,
    B: TryStoreValue<T>,
{
    fn try_store(value: T) -> Result<Self, T> {
        match A::try_store(value) {
            Ok(a) => Ok(ChainStorage::First(a)),
            Err(value) => B::try_store(value).map(ChainStorage::Second),
        }
    }
}

//! Typed slot storage.

use veneer_core::{PtrConst, PtrMut, TypeInfo};

use super::{ExclusiveStorage, Storage, StoreValue, TryStoreValue};

/// An optional slot for one statically known type.
///
/// Dispatch still goes through the capability's tables, but the storage
/// itself is a plain `Option<T>` — no erasure, no allocation, and the
/// value can be recovered with [`SlotStorage::into_inner`].
pub struct SlotStorage<T> {
    value: Option<T>,
}

impl<T> SlotStorage<T> {
    /// Recovers the stored value, if any.
    pub fn into_inner(self) -> Option<T> {
        self.value
    }
}

impl<T: 'static> Storage for SlotStorage<T> {
    fn empty() -> Self {
        SlotStorage { value: None }
    }

    fn as_ptr(&self) -> Option<PtrConst<'_>> {
        self.value.as_ref().map(PtrConst::from_ref)
    }

    fn as_ptr_mut(&mut self) -> Option<PtrMut<'_>> {
        self.value.as_mut().map(PtrMut::from_mut)
    }

    fn type_info(&self) -> Option<&'static TypeInfo> {
        self.value.as_ref().map(|_| TypeInfo::of::<T>())
    }

    fn reset(&mut self) {
        self.value = None;
    }

    fn take(&mut self) -> Self {
        SlotStorage {
            value: self.value.take(),
        }
    }
}

impl<T: 'static> ExclusiveStorage for SlotStorage<T> {
    fn discard(&mut self) {
        if let Some(value) = self.value.take() {
            core::mem::forget(value);
        }
    }
}

impl<T: Clone> Clone for SlotStorage<T> {
    fn clone(&self) -> Self {
        SlotStorage {
            value: self.value.clone(),
        }
    }
}

impl<T: 'static> StoreValue<T> for SlotStorage<T> {
    fn store(value: T) -> Self {
        SlotStorage { value: Some(value) }
    }
}

impl<T: 'static> TryStoreValue<T> for SlotStorage<T> {
    fn try_store(value: T) -> Result<Self, T> {
        Ok(Self::store(value))
    }
}

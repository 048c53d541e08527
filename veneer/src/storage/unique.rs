//! Heap-owning storage with unique ownership.

use veneer_core::{PtrConst, PtrMut, TypeInfo};

use super::{ExclusiveStorage, OwnedBlock, Storage, StoreValue, TryStoreValue};

/// Owns one heap-allocated value, move-only. The `Box` of storage
/// policies: no `Clone` requirement on the stored type, no clone on the
/// storage.
pub struct BoxStorage {
    block: Option<OwnedBlock>,
}

impl Storage for BoxStorage {
    fn empty() -> Self {
        BoxStorage { block: None }
    }

    fn as_ptr(&self) -> Option<PtrConst<'_>> {
        self.block.as_ref().map(OwnedBlock::as_const)
    }

    fn as_ptr_mut(&mut self) -> Option<PtrMut<'_>> {
        self.block.as_mut().map(OwnedBlock::as_mut)
    }

    fn type_info(&self) -> Option<&'static TypeInfo> {
        self.block.as_ref().map(OwnedBlock::info)
    }

    fn reset(&mut self) {
        self.block = None;
    }

    fn take(&mut self) -> Self {
        BoxStorage {
            block: self.block.take(),
        }
    }
}

impl ExclusiveStorage for BoxStorage {
    fn discard(&mut self) {
        if let Some(block) = self.block.take() {
            block.discard();
        }
    }
}

impl<T: 'static> StoreValue<T> for BoxStorage {
    fn store(value: T) -> Self {
        BoxStorage {
            block: Some(OwnedBlock::new(value, TypeInfo::of::<T>())),
        }
    }
}

impl<T: 'static> TryStoreValue<T> for BoxStorage {
    fn try_store(value: T) -> Result<Self, T> {
        Ok(Self::store(value))
    }
}

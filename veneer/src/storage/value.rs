//! Heap-owning storage with value semantics.

use veneer_core::{PtrConst, PtrMut, TypeInfo};

use super::{ExclusiveStorage, OwnedBlock, Storage, StoreValue, TryStoreValue};

/// Owns one heap-allocated value with value semantics: cloning the proxy
/// clones the value.
///
/// Construction requires `T: Clone` so the descriptor always carries a
/// duplicate operation.
pub struct ValueStorage {
    block: Option<OwnedBlock>,
}

impl Storage for ValueStorage {
    fn empty() -> Self {
        ValueStorage { block: None }
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
        ValueStorage {
            block: self.block.take(),
        }
    }
}

impl ExclusiveStorage for ValueStorage {
    fn discard(&mut self) {
        if let Some(block) = self.block.take() {
            block.discard();
        }
    }
}

impl Clone for ValueStorage {
    fn clone(&self) -> Self {
        let block = self.block.as_ref().map(|block| match block.duplicate() {
            Some(copy) => copy,
            // Construction only goes through `of_cloneable` descriptors.
            None => unreachable!("value storage holds a non-cloneable descriptor"),
        });
        ValueStorage { block }
    }
}

impl<T: Clone + 'static> StoreValue<T> for ValueStorage {
    fn store(value: T) -> Self {
        ValueStorage {
            block: Some(OwnedBlock::new(value, TypeInfo::of_cloneable::<T>())),
        }
    }
}

impl<T: Clone + 'static> TryStoreValue<T> for ValueStorage {
    fn try_store(value: T) -> Result<Self, T> {
        Ok(Self::store(value))
    }
}

//! Non-owning storage over borrowed values.

use veneer_core::{PtrConst, PtrMut, TypeInfo};

use super::Storage;

/// Borrows a value owned elsewhere. Copyable, never drops anything, and
/// only ever grants shared access.
#[derive(Clone, Copy)]
pub struct BorrowedStorage<'a> {
    slot: Option<(PtrConst<'a>, &'static TypeInfo)>,
}

impl<'a> BorrowedStorage<'a> {
    /// Borrows `value` for the storage's lifetime.
    pub fn borrowing<T: 'static>(value: &'a T) -> Self {
        BorrowedStorage {
            slot: Some((PtrConst::from_ref(value), TypeInfo::of::<T>())),
        }
    }

    pub(crate) fn from_raw_parts(ptr: PtrConst<'a>, info: &'static TypeInfo) -> Self {
        BorrowedStorage {
            slot: Some((ptr, info)),
        }
    }
}

impl Storage for BorrowedStorage<'_> {
    fn empty() -> Self {
        BorrowedStorage { slot: None }
    }

    fn as_ptr(&self) -> Option<PtrConst<'_>> {
        self.slot.map(|(ptr, _)| ptr)
    }

    fn as_ptr_mut(&mut self) -> Option<PtrMut<'_>> {
        None
    }

    fn type_info(&self) -> Option<&'static TypeInfo> {
        self.slot.map(|(_, info)| info)
    }

    fn reset(&mut self) {
        self.slot = None;
    }

    fn take(&mut self) -> Self {
        BorrowedStorage {
            slot: self.slot.take(),
        }
    }
}

/// Borrows a value mutably. Move-only, never drops anything, grants both
/// shared and exclusive access.
pub struct BorrowedMutStorage<'a> {
    slot: Option<(PtrMut<'a>, &'static TypeInfo)>,
}

impl<'a> BorrowedMutStorage<'a> {
    /// Borrows `value` exclusively for the storage's lifetime.
    pub fn borrowing_mut<T: 'static>(value: &'a mut T) -> Self {
        BorrowedMutStorage {
            slot: Some((PtrMut::from_mut(value), TypeInfo::of::<T>())),
        }
    }
}

impl Storage for BorrowedMutStorage<'_> {
    fn empty() -> Self {
        BorrowedMutStorage { slot: None }
    }

    fn as_ptr(&self) -> Option<PtrConst<'_>> {
        self.slot.map(|(ptr, _)| ptr.as_const())
    }

    fn as_ptr_mut(&mut self) -> Option<PtrMut<'_>> {
        self.slot.map(|(ptr, _)| ptr)
    }

    fn type_info(&self) -> Option<&'static TypeInfo> {
        self.slot.map(|(_, info)| info)
    }

    fn reset(&mut self) {
        self.slot = None;
    }

    fn take(&mut self) -> Self {
        BorrowedMutStorage {
            slot: self.slot.take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrowed_storage_points_at_the_original() {
        let value = 11u64;
        let storage = BorrowedStorage::borrowing(&value);
        let ptr = storage.as_ptr().unwrap();
        assert_eq!(ptr.as_byte_ptr(), core::ptr::from_ref(&value).cast());
        assert_eq!(unsafe { ptr.get::<u64>() }, &11);
    }

    #[test]
    fn mutable_borrow_writes_through() {
        let mut value = 1u64;
        {
            let mut storage = BorrowedMutStorage::borrowing_mut(&mut value);
            let ptr = storage.as_ptr_mut().unwrap();
            *unsafe { ptr.as_mut::<u64>() } = 9;
        }
        assert_eq!(value, 9);
    }
}

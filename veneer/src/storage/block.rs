//! Heap block shared by the owning storage policies.

use core::any::TypeId;
use core::ptr::NonNull;

use veneer_core::{PtrConst, PtrMut, PtrUninit, TypeInfo};

/// One heap allocation holding one initialized erased value.
///
/// Destroys the value and frees the block on drop. Moving the block moves
/// only the pointer; the value's address is stable.
pub(crate) struct OwnedBlock {
    ptr: NonNull<u8>,
    info: &'static TypeInfo,
}

impl OwnedBlock {
    pub(crate) fn new<T: 'static>(value: T, info: &'static TypeInfo) -> Self {
        debug_assert!(info.id == TypeId::of::<T>());
        let init = unsafe { info.allocate().put(value) };
        OwnedBlock {
            ptr: unsafe { NonNull::new_unchecked(init.as_mut_byte_ptr()) },
            info,
        }
    }

    pub(crate) fn info(&self) -> &'static TypeInfo {
        self.info
    }

    pub(crate) fn as_const(&self) -> PtrConst<'_> {
        PtrConst::new(self.ptr)
    }

    pub(crate) fn as_mut(&mut self) -> PtrMut<'_> {
        PtrMut::new(self.ptr)
    }

    /// Clone-constructs a second block, if the descriptor carries a
    /// duplicate operation.
    pub(crate) fn duplicate(&self) -> Option<OwnedBlock> {
        let dup = self.info.ops.duplicate?;
        let block = self.info.allocate();
        unsafe { dup(self.as_const(), block) };
        Some(OwnedBlock {
            ptr: unsafe { NonNull::new_unchecked(block.as_mut_byte_ptr()) },
            info: self.info,
        })
    }

    /// Frees the block without dropping the value.
    pub(crate) fn discard(self) {
        let this = core::mem::ManuallyDrop::new(self);
        unsafe { this.info.deallocate(PtrUninit::new(this.ptr)) };
    }
}

impl Drop for OwnedBlock {
    fn drop(&mut self) {
        unsafe {
            (self.info.ops.drop_in_place)(PtrMut::new(self.ptr));
            self.info.deallocate(PtrUninit::new(self.ptr));
        }
    }
}

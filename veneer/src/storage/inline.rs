//! Inline storage: the value lives inside the proxy itself.

use core::mem::MaybeUninit;
use core::ptr::NonNull;

use veneer_core::{PtrConst, PtrMut, PtrUninit, TypeInfo};

use super::{ExclusiveStorage, Storage, StoreValue, TryStoreValue};

/// Stores the value in an embedded buffer shaped like `Space`, avoiding
/// the allocator entirely.
///
/// A type fits when its size and alignment are both covered by `Space`.
/// [`StoreValue::store`] checks the fit at compile time; use
/// [`TryStoreValue::try_store`] to fall back at runtime instead (that is
/// what [`SmallStorage`](super::SmallStorage) does).
///
/// ```compile_fail
/// use veneer::{InlineStorage, StoreValue};
///
/// // Four words do not fit a one-word buffer.
/// let _ = <InlineStorage<[usize; 1]> as StoreValue<[u64; 4]>>::store([0u64; 4]);
/// ```
///
/// Value semantics: construction requires `T: Clone` and cloning the
/// storage clones the value.
pub struct InlineStorage<Space = [usize; 3]> {
    buf: MaybeUninit<Space>,
    info: Option<&'static TypeInfo>,
}

/// Whether a `T` can live in a `Space`-shaped buffer.
pub(crate) const fn fits<Space, T>() -> bool {
    size_of::<T>() <= size_of::<Space>() && align_of::<T>() <= align_of::<Space>()
}

impl<Space> InlineStorage<Space> {
    fn base_ptr(&self) -> NonNull<u8> {
        unsafe { NonNull::new_unchecked(self.buf.as_ptr().cast::<u8>().cast_mut()) }
    }

    // Writes and drops must go through a pointer derived from `&mut self`;
    // one derived from a shared borrow is read-only under the aliasing
    // rules.
    fn base_ptr_mut(&mut self) -> NonNull<u8> {
        unsafe { NonNull::new_unchecked(self.buf.as_mut_ptr().cast::<u8>()) }
    }

    fn store_unchecked<T: Clone + 'static>(value: T) -> Self {
        debug_assert!(fits::<Space, T>());
        let mut buf = MaybeUninit::<Space>::uninit();
        unsafe {
            PtrUninit::from_maybe_uninit(&mut buf)
                .as_mut_byte_ptr()
                .cast::<T>()
                .write(value);
        }
        InlineStorage {
            buf,
            info: Some(TypeInfo::of_cloneable::<T>()),
        }
    }
}

impl<Space> Storage for InlineStorage<Space> {
    fn empty() -> Self {
        InlineStorage {
            buf: MaybeUninit::uninit(),
            info: None,
        }
    }

    fn as_ptr(&self) -> Option<PtrConst<'_>> {
        self.info.map(|_| PtrConst::new(self.base_ptr()))
    }

    fn as_ptr_mut(&mut self) -> Option<PtrMut<'_>> {
        if self.info.is_some() {
            Some(PtrMut::new(self.base_ptr_mut()))
        } else {
            None
        }
    }

    fn type_info(&self) -> Option<&'static TypeInfo> {
        self.info
    }

    fn reset(&mut self) {
        if let Some(info) = self.info.take() {
            unsafe { (info.ops.drop_in_place)(PtrMut::new(self.base_ptr_mut())) };
        }
    }

    fn take(&mut self) -> Self {
        match self.info.take() {
            None => Self::empty(),
            Some(info) => {
                let mut buf = MaybeUninit::<Space>::uninit();
                unsafe {
                    (info.ops.relocate)(
                        PtrMut::new(self.base_ptr_mut()),
                        PtrUninit::from_maybe_uninit(&mut buf),
                    );
                }
                InlineStorage {
                    buf,
                    info: Some(info),
                }
            }
        }
    }
}

impl<Space> Drop for InlineStorage<Space> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<Space> ExclusiveStorage for InlineStorage<Space> {
    fn discard(&mut self) {
        self.info = None;
    }
}

impl<Space> Clone for InlineStorage<Space> {
    fn clone(&self) -> Self {
        match self.info {
            None => Self::empty(),
            Some(info) => {
                let mut buf = MaybeUninit::<Space>::uninit();
                match info.ops.duplicate {
                    Some(dup) => unsafe {
                        dup(
                            PtrConst::new(self.base_ptr()),
                            PtrUninit::from_maybe_uninit(&mut buf),
                        );
                    },
                    // Construction only goes through `of_cloneable` descriptors.
                    None => unreachable!("inline storage holds a non-cloneable descriptor"),
                }
                InlineStorage {
                    buf,
                    info: Some(info),
                }
            }
        }
    }
}

impl<Space, T: Clone + 'static> StoreValue<T> for InlineStorage<Space> {
    fn store(value: T) -> Self {
        const {
            assert!(
                fits::<Space, T>(),
                "value does not fit the inline storage's space parameter",
            );
        }
        Self::store_unchecked(value)
    }
}

impl<Space, T: Clone + 'static> TryStoreValue<T> for InlineStorage<Space> {
    fn try_store(value: T) -> Result<Self, T> {
        if fits::<Space, T>() {
            Ok(Self::store_unchecked(value))
        } else {
            Err(value)
        }
    }
}

//! Per-type descriptors
//!
//! A [`TypeInfo`] is everything a storage policy needs to own a value it
//! cannot name: layout to allocate with, and erased entry points to
//! destroy, relocate, and duplicate it.

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

use crate::{ConstTypeId, PtrConst, PtrMut, PtrUninit};

/// Function type for dropping a value in place.
pub type DropFn = unsafe fn(PtrMut<'_>);

/// Function type for moving a value into uninitialized memory.
///
/// The source becomes uninitialized; in Rust this is always a bitwise copy.
pub type RelocateFn = unsafe fn(src: PtrMut<'_>, dst: PtrUninit<'_>);

/// Function type for clone-constructing a value into uninitialized memory.
pub type DuplicateFn = unsafe fn(src: PtrConst<'_>, dst: PtrUninit<'_>);

/// Erased per-type operations.
///
/// All function pointers are `unsafe fn` because they operate on erased
/// pointers. Callers must ensure the pointer actually refers to a valid,
/// properly aligned instance of the described type.
#[derive(Clone, Copy)]
pub struct TypeOps {
    /// Drop the value in place.
    pub drop_in_place: DropFn,

    /// Move the value to a new location, leaving the source uninitialized.
    pub relocate: RelocateFn,

    /// Clone the value into uninitialized memory.
    ///
    /// `None` when the descriptor was built without a `Clone` bound
    /// (see [`TypeInfo::of`] vs [`TypeInfo::of_cloneable`]).
    pub duplicate: Option<DuplicateFn>,
}

/// Descriptor for one concrete type: identity, layout, and erased
/// operations.
///
/// Obtained via [`TypeInfo::of`] or [`TypeInfo::of_cloneable`]; both return
/// `&'static` references. The two constructors produce distinct statics for
/// the same `T`, so identity comparisons must go through [`TypeInfo::id`],
/// never through the descriptor's address.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    /// Unique type identifier.
    pub id: ConstTypeId,

    /// The type's name, as reported by [`core::any::type_name`].
    pub type_name: &'static str,

    /// Size and alignment — enough to allocate (but not initialize).
    pub layout: Layout,

    /// Erased destroy/relocate/duplicate entry points.
    pub ops: TypeOps,
}

unsafe fn drop_erased<T>(value: PtrMut<'_>) {
    unsafe {
        value.drop_in_place::<T>();
    }
}

unsafe fn relocate_erased<T>(src: PtrMut<'_>, dst: PtrUninit<'_>) {
    unsafe {
        let value = src.read::<T>();
        dst.put(value);
    }
}

unsafe fn duplicate_erased<T: Clone>(src: PtrConst<'_>, dst: PtrUninit<'_>) {
    unsafe {
        let value = src.get::<T>().clone();
        dst.put(value);
    }
}

impl TypeInfo {
    const fn describe<T: 'static>(duplicate: Option<DuplicateFn>) -> Self {
        TypeInfo {
            id: ConstTypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            layout: Layout::new::<T>(),
            ops: TypeOps {
                drop_in_place: drop_erased::<T>,
                relocate: relocate_erased::<T>,
                duplicate,
            },
        }
    }

    /// The descriptor for `T`, without a duplicate operation.
    #[inline]
    pub const fn of<T: 'static>() -> &'static Self {
        const { &Self::describe::<T>(None) }
    }

    /// The descriptor for `T`, with `duplicate` backed by `T::clone`.
    #[inline]
    pub const fn of_cloneable<T: Clone + 'static>() -> &'static Self {
        const { &Self::describe::<T>(Some(duplicate_erased::<T>)) }
    }

    /// Size of the described type in bytes.
    #[inline]
    pub const fn size(&self) -> usize {
        self.layout.size()
    }

    /// Alignment of the described type in bytes.
    #[inline]
    pub const fn align(&self) -> usize {
        self.layout.align()
    }

    /// Allocates an uninitialized heap block for one value of this type.
    ///
    /// ZSTs do not hit the allocator; they get a well-aligned dangling
    /// pointer, matching what [`Self::deallocate`] expects.
    #[cfg(feature = "alloc")]
    pub fn allocate(&self) -> PtrUninit<'static> {
        let raw = if self.layout.size() == 0 {
            core::ptr::without_provenance_mut::<u8>(self.layout.align())
        } else {
            let raw = unsafe { alloc::alloc::alloc(self.layout) };
            if raw.is_null() {
                alloc::alloc::handle_alloc_error(self.layout);
            }
            raw
        };
        PtrUninit::new(unsafe { NonNull::new_unchecked(raw) })
    }

    /// Frees a block obtained from [`Self::allocate`].
    ///
    /// # Safety
    ///
    /// `block` must come from `allocate` on this same descriptor and must
    /// not hold a live (un-dropped) value.
    #[cfg(feature = "alloc")]
    pub unsafe fn deallocate(&self, block: PtrUninit<'_>) {
        if self.layout.size() != 0 {
            unsafe { alloc::alloc::dealloc(block.as_mut_byte_ptr(), self.layout) };
        }
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("type_name", &self.type_name)
            .field("size", &self.layout.size())
            .field("align", &self.layout.align())
            .field("has_duplicate", &self.ops.duplicate.is_some())
            .finish()
    }
}
